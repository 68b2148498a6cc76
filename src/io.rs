//! I/O dispatch: (factory-key, datatype-name) -> specializer lookup,
//! orchestrating scoped file handles (spec §4.H).
//!
//! Grounded in `original_source/base/rConfigDataFormat.cc` / `rIONetcdf.h`'s
//! "introduce self into factories" pattern, generalized per `SPEC_FULL.md`
//! §4.H into two nested registries seeded once by an explicit
//! `initialize()` call (spec §9 "global registries and singletons").

pub mod compression;
pub mod grib2;
pub mod hdf5_odim;
pub mod mrms_raw;
pub mod netcdf_generic;
pub mod netcdf_geo;
pub mod text;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use lazy_static::lazy_static;

use crate::error::{RapioError, Result};
use crate::geospatial::{BinaryTable, LatLonGrid, LatLonHeightGrid, RadialSet};
use crate::grid::{DataGrid, Keys, SparseLifecycle};

/// A read/write-recognized file family (spec §6 "File formats recognized
/// on read").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKey {
    NetCdf,
    Hdf5,
    Grib2,
    Text,
    MrmsRaw,
}

impl FormatKey {
    /// Resolves a format from a (possibly compression-suffixed) path, by
    /// suffix then content sniff is the caller's job (spec §6); this is
    /// the suffix half.
    pub fn from_suffix(path: &str) -> Option<FormatKey> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".nc") || lower.ends_with(".netcdf") {
            Some(FormatKey::NetCdf)
        } else if lower.ends_with(".h5") || lower.ends_with(".hdf5") {
            Some(FormatKey::Hdf5)
        } else if lower.ends_with(".grib2") || lower.ends_with(".grb2") {
            Some(FormatKey::Grib2)
        } else if lower.ends_with(".raw") {
            Some(FormatKey::MrmsRaw)
        } else if lower.ends_with(".txt") || lower.ends_with(".cdl") {
            Some(FormatKey::Text)
        } else {
            None
        }
    }
}

/// A polymorphic DataType handle (spec §3's DataGrid + geospatial
/// specializations), modeled as a tagged enum per spec §9's guidance on
/// attribute-value polymorphism, extended here to the DataType hierarchy:
/// the dispatch layer hands callers one concrete, matchable type instead
/// of a trait object.
#[derive(Debug, Clone)]
pub enum DataTypeHandle {
    Grid(DataGrid),
    RadialSet(RadialSet),
    LatLonGrid(LatLonGrid),
    LatLonHeightGrid(LatLonHeightGrid),
    BinaryTable(BinaryTable),
    /// Several DataTypes produced by a single read (spec §4.I ODIM PVOL:
    /// "if multiple datasets are produced, they are returned as a
    /// MultiDataType bundle").
    Multi(Vec<DataTypeHandle>),
}

impl DataTypeHandle {
    pub fn data_type_tag(&self) -> &str {
        match self {
            DataTypeHandle::Grid(g) => g.data_type_tag(),
            DataTypeHandle::RadialSet(r) => r.data_type_tag(),
            DataTypeHandle::LatLonGrid(l) => l.data_type_tag(),
            DataTypeHandle::LatLonHeightGrid(l) => l.data_type_tag(),
            DataTypeHandle::BinaryTable(_) => "BinaryTable",
            DataTypeHandle::Multi(_) => "MultiDataType",
        }
    }

    pub fn as_grid(&self) -> Option<&DataGrid> {
        match self {
            DataTypeHandle::Grid(g) => Some(g),
            DataTypeHandle::RadialSet(r) => Some(r),
            DataTypeHandle::LatLonGrid(l) => Some(l),
            DataTypeHandle::LatLonHeightGrid(l) => Some(l),
            DataTypeHandle::BinaryTable(_) => None,
            DataTypeHandle::Multi(_) => None,
        }
    }

    /// The member DataTypes of a `Multi` bundle, or a one-element slice of
    /// `self` for every other variant -- lets callers treat single reads
    /// and ODIM PVOL bundles uniformly.
    pub fn members(&self) -> Vec<&DataTypeHandle> {
        match self {
            DataTypeHandle::Multi(v) => v.iter().collect(),
            other => vec![other],
        }
    }

    /// Runs `postRead` (spec §4.H step 7): unsparses the primary array if
    /// the specializer handed back a sparse-encoded grid.
    pub fn post_read(&mut self, keys: &Keys) -> Result<()> {
        match self {
            DataTypeHandle::Grid(g) => g.post_read(keys),
            DataTypeHandle::RadialSet(r) => r.post_read(keys),
            DataTypeHandle::LatLonGrid(l) => l.post_read(keys),
            DataTypeHandle::LatLonHeightGrid(l) => l.post_read(keys),
            DataTypeHandle::BinaryTable(_) => Ok(()),
            DataTypeHandle::Multi(v) => v.iter_mut().try_for_each(|dt| dt.post_read(keys)),
        }
    }

    pub fn pre_write(&mut self, keys: &Keys) -> Result<()> {
        match self {
            DataTypeHandle::Grid(g) => g.pre_write(keys),
            DataTypeHandle::RadialSet(r) => r.pre_write(keys),
            DataTypeHandle::LatLonGrid(l) => l.pre_write(keys),
            DataTypeHandle::LatLonHeightGrid(l) => l.pre_write(keys),
            DataTypeHandle::BinaryTable(_) => Ok(()),
            DataTypeHandle::Multi(v) => v.iter_mut().try_for_each(|dt| dt.pre_write(keys)),
        }
    }

    pub fn post_write(&mut self, keys: &Keys) -> Result<()> {
        match self {
            DataTypeHandle::Grid(g) => g.post_write(keys),
            DataTypeHandle::RadialSet(r) => r.post_write(keys),
            DataTypeHandle::LatLonGrid(l) => l.post_write(keys),
            DataTypeHandle::LatLonHeightGrid(l) => l.post_write(keys),
            DataTypeHandle::BinaryTable(_) => Ok(()),
            DataTypeHandle::Multi(v) => v.iter_mut().try_for_each(|dt| dt.post_write(keys)),
        }
    }
}

pub type ReadSpecializer = fn(&Keys) -> Result<DataTypeHandle>;
pub type WriteSpecializer = fn(&DataTypeHandle, &Keys) -> Result<()>;

#[derive(Default)]
struct Registry {
    readers: HashMap<(FormatKey2, String), ReadSpecializer>,
    writers: HashMap<(FormatKey2, String), WriteSpecializer>,
    generic_readers: HashMap<FormatKey2, ReadSpecializer>,
}

// Hash/Eq wrapper so FormatKey can key a HashMap without deriving more than
// it needs to in its public-facing form.
type FormatKey2 = FormatKey;

lazy_static! {
    static ref REGISTRY: Mutex<Registry> = Mutex::new(Registry::default());
}
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Registers `specializer` for (format, datatype_tag). Calling this after
/// `initialize()` has run is a logged programming error (spec §9 "no
/// mutation after init"), not a panic -- the registration is simply
/// dropped.
pub fn register_reader(format: FormatKey, datatype_tag: &str, specializer: ReadSpecializer) {
    if INITIALIZED.load(Ordering::SeqCst) {
        tracing::error!(target: "rapio::io", datatype_tag, "registration attempted after initialize(); ignored");
        return;
    }
    REGISTRY.lock().unwrap().readers.insert((format, datatype_tag.to_string()), specializer);
}

pub fn register_writer(format: FormatKey, datatype_tag: &str, specializer: WriteSpecializer) {
    if INITIALIZED.load(Ordering::SeqCst) {
        tracing::error!(target: "rapio::io", datatype_tag, "registration attempted after initialize(); ignored");
        return;
    }
    REGISTRY.lock().unwrap().writers.insert((format, datatype_tag.to_string()), specializer);
}

pub fn register_generic_reader(format: FormatKey, specializer: ReadSpecializer) {
    if INITIALIZED.load(Ordering::SeqCst) {
        tracing::error!(target: "rapio::io", "registration attempted after initialize(); ignored");
        return;
    }
    REGISTRY.lock().unwrap().generic_readers.insert(format, specializer);
}

/// Seeds the built-in format/datatype registries. Idempotent; subsequent
/// calls are no-ops. Must run before any read/write dispatch (spec §5/§9).
pub fn initialize() {
    if INITIALIZED.swap(true, Ordering::SeqCst) {
        return;
    }
    // Re-open for the duration of seeding; initialize() itself is the one
    // caller allowed to populate the registry after flipping the flag, so
    // flip it back temporarily.
    INITIALIZED.store(false, Ordering::SeqCst);

    register_generic_reader(FormatKey::NetCdf, netcdf_generic::read_generic);
    register_reader(FormatKey::NetCdf, "RadialSet", netcdf_geo::read_radial_set);
    register_reader(FormatKey::NetCdf, "LatLonGrid", netcdf_geo::read_latlon_grid);
    register_reader(FormatKey::NetCdf, "LatLonHeightGrid", netcdf_geo::read_latlon_height_grid);
    register_reader(FormatKey::NetCdf, "BinaryTable", netcdf_generic::read_binary_table);

    register_writer(FormatKey::NetCdf, "RadialSet", netcdf_geo::write_radial_set);
    register_writer(FormatKey::NetCdf, "LatLonGrid", netcdf_geo::write_latlon_grid);
    register_writer(FormatKey::NetCdf, "LatLonHeightGrid", netcdf_geo::write_latlon_height_grid);
    register_writer(FormatKey::NetCdf, "DataGrid", netcdf_generic::write_generic);
    register_writer(FormatKey::NetCdf, "BinaryTable", netcdf_generic::write_binary_table);

    register_generic_reader(FormatKey::Hdf5, hdf5_odim::read_odim);
    register_generic_reader(FormatKey::Grib2, grib2::read_catalog);
    register_generic_reader(FormatKey::MrmsRaw, mrms_raw::read_raw);

    register_writer(FormatKey::Text, "DataGrid", text::write_text);
    register_writer(FormatKey::Text, "RadialSet", text::write_text);
    register_writer(FormatKey::Text, "LatLonGrid", text::write_text);
    register_writer(FormatKey::Text, "LatLonHeightGrid", text::write_text);

    INITIALIZED.store(true, Ordering::SeqCst);
}

/// A scratch file holding the transparently-decompressed bytes of a
/// `.gz`/`.bz2`/`.xz`/`.zst`-suffixed source (spec §4.H step 2, §6).
/// Native-library readers (netcdf, hdf5) need a real path, not a byte
/// buffer, so decompression happens to a temp file that is removed on
/// every exit path, including an early return -- the same "scoped
/// acquisition" discipline spec §5 asks of native file handles.
struct ScratchFile {
    path: Option<std::path::PathBuf>,
}

impl ScratchFile {
    /// `None` when `path` has no recognized compression suffix -- the
    /// caller should use `path` unchanged in that case.
    fn for_path(path: &str) -> Result<Option<ScratchFile>> {
        let (bytes, stem) = match compression::Codec::from_suffix(path) {
            Some(_) => compression::read_bytes(path)?,
            None => return Ok(None),
        };
        let base = std::path::Path::new(&stem).file_name().and_then(|n| n.to_str()).unwrap_or("rapio-scratch");
        let scratch = std::env::temp_dir().join(format!("rapio-{}-{}", std::process::id(), base));
        std::fs::write(&scratch, bytes)?;
        Ok(Some(ScratchFile { path: Some(scratch) }))
    }

    fn path_str(&self) -> &str {
        self.path.as_deref().and_then(|p| p.to_str()).unwrap_or("")
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if let Some(p) = self.path.take() {
            let _ = std::fs::remove_file(p);
        }
    }
}

/// Opens `path`, dispatches by format and discriminator attribute, and
/// returns a fully post-processed `DataTypeHandle` (spec §4.H steps 1-7).
///
/// Failure policy (spec §7): open failure, missing discriminator, or a
/// missing/erroring specializer logs one severe line and returns `Ok(None)`
/// rather than propagating the error to the caller -- this is the
/// documented "library errors are values below the dispatch boundary, the
/// boundary itself returns null/false" split (spec §7 propagation policy).
pub fn read(path: &str, caller_keys: &Keys) -> Result<Option<DataTypeHandle>> {
    initialize();

    let scratch = ScratchFile::for_path(path)?;
    let resolved_path: &str = scratch.as_ref().map(|s| s.path_str()).unwrap_or(path);

    let format = match FormatKey::from_suffix(resolved_path) {
        Some(f) => f,
        None => {
            tracing::error!(target: "rapio::io", path, "unrecognized file format");
            return Ok(None);
        }
    };

    let mut keys = caller_keys.clone();
    keys.insert("filename".to_string(), resolved_path.to_string());

    let registry = REGISTRY.lock().unwrap();
    let tag_guess = probe_discriminator(format, resolved_path);

    let specializer = tag_guess
        .as_deref()
        .and_then(|tag| registry.readers.get(&(format, tag.to_string())))
        .copied();

    let specializer = match specializer {
        Some(s) => s,
        None => match registry.generic_readers.get(&format) {
            Some(s) => {
                if tag_guess.is_some() {
                    tracing::info!(target: "rapio::io", path, tag = tag_guess.as_deref(), "no specializer for datatype, falling back to generic reader");
                }
                *s
            }
            None => {
                tracing::error!(target: "rapio::io", path, "no specializer and no generic fallback registered for format");
                return Ok(None);
            }
        },
    };
    drop(registry);

    match specializer(&keys) {
        Ok(mut dt) => {
            if let Err(e) = dt.post_read(&keys) {
                tracing::error!(target: "rapio::io", path, error = %e, "postRead failed");
                return Ok(None);
            }
            Ok(Some(dt))
        }
        Err(e) => {
            tracing::error!(target: "rapio::io", path, error = %e, "read failed");
            Ok(None)
        }
    }
}

/// Writes `dt` to `path` (spec §4.H write path: resolve writer, preWrite,
/// write, postWrite). Returns `Ok(false)` (not an `Err`) on any
/// specializer failure, per the same boundary-translation policy as
/// `read`.
pub fn write(dt: &mut DataTypeHandle, path: &str, caller_keys: &Keys) -> Result<bool> {
    initialize();

    let codec = compression::Codec::from_suffix(path);
    let (stem, scratch_path) = match codec {
        Some((_, stem)) => {
            let base = std::path::Path::new(stem).file_name().and_then(|n| n.to_str()).unwrap_or("rapio-scratch");
            let scratch = std::env::temp_dir().join(format!("rapio-write-{}-{}", std::process::id(), base));
            (stem.to_string(), Some(scratch))
        }
        None => (path.to_string(), None),
    };
    let write_path: &str = scratch_path.as_ref().and_then(|p| p.to_str()).unwrap_or(&stem);

    let format = match FormatKey::from_suffix(&stem) {
        Some(f) => f,
        None => {
            tracing::error!(target: "rapio::io", path, "unrecognized file format");
            return Ok(false);
        }
    };

    let mut keys = caller_keys.clone();
    keys.insert("filename".to_string(), write_path.to_string());

    let tag = dt.data_type_tag().to_string();
    let specializer = {
        let registry = REGISTRY.lock().unwrap();
        registry.writers.get(&(format, tag.clone())).copied()
    };
    let specializer = match specializer {
        Some(s) => s,
        None => {
            tracing::error!(target: "rapio::io", path, tag, "no writer registered for (format, datatype)");
            return Ok(false);
        }
    };

    if let Err(e) = dt.pre_write(&keys) {
        tracing::error!(target: "rapio::io", path, error = %e, "preWrite failed");
        cleanup_scratch(&scratch_path);
        return Ok(false);
    }

    let result = specializer(dt, &keys);

    if let Err(e) = dt.post_write(&keys) {
        tracing::error!(target: "rapio::io", path, error = %e, "postWrite failed");
        cleanup_scratch(&scratch_path);
        return Ok(false);
    }

    let outcome = match result {
        Ok(()) => Ok(true),
        Err(e) => {
            tracing::error!(target: "rapio::io", path, error = %e, "write failed");
            Ok(false)
        }
    };

    if matches!(outcome, Ok(true)) {
        if let (Some((codec, _)), Some(scratch)) = (codec, &scratch_path) {
            let finish = (|| -> Result<()> {
                let raw = std::fs::read(scratch)?;
                let compressed = codec.compress(&raw)?;
                std::fs::write(path, compressed)?;
                Ok(())
            })();
            cleanup_scratch(&scratch_path);
            if let Err(e) = finish {
                tracing::error!(target: "rapio::io", path, error = %e, "compression post-process failed");
                return Ok(false);
            }
        }
    } else {
        cleanup_scratch(&scratch_path);
    }

    outcome
}

fn cleanup_scratch(scratch_path: &Option<std::path::PathBuf>) {
    if let Some(p) = scratch_path {
        let _ = std::fs::remove_file(p);
    }
}

/// Reads just the discriminator attribute (spec §4.H step 4): NetCDF's
/// global `DataType`, HDF5's `/what/object`, or `None` for formats with no
/// discriminator (GRIB2 is treated as a whole-file catalog; spec §4.H).
fn probe_discriminator(format: FormatKey, path: &str) -> Option<String> {
    match format {
        FormatKey::NetCdf => netcdf_generic::probe_data_type_tag(path).ok().flatten(),
        FormatKey::Hdf5 => hdf5_odim::probe_object_tag(path).ok().flatten(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_resolution_by_suffix() {
        assert_eq!(FormatKey::from_suffix("foo.nc"), Some(FormatKey::NetCdf));
        assert_eq!(FormatKey::from_suffix("foo.NC"), Some(FormatKey::NetCdf));
        assert_eq!(FormatKey::from_suffix("foo.h5"), Some(FormatKey::Hdf5));
        assert_eq!(FormatKey::from_suffix("foo.grib2"), Some(FormatKey::Grib2));
        assert_eq!(FormatKey::from_suffix("foo.raw"), Some(FormatKey::MrmsRaw));
        assert_eq!(FormatKey::from_suffix("foo.bin"), None);
    }

    #[test]
    fn unreadable_path_returns_ok_none_not_err() {
        initialize();
        let keys = Keys::new();
        let result = read("/nonexistent/path/does/not/exist.nc", &keys);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn unrecognized_suffix_returns_ok_none() {
        initialize();
        let keys = Keys::new();
        let result = read("/tmp/whatever.bin", &keys);
        assert!(matches!(result, Ok(None)));
    }
}
