//! HDF5/ODIM radar-volume specializer (spec §4.I, §6 "HDF5 / ODIM
//! conventions read").
//!
//! Grounded in `original_source/modules/iohdf5/rODIMDataHandler.cc`'s
//! `readODIM_MOMENT`: per-dataset geometry (`elangle`/`nbins`/`nrays`/
//! `rscale`/`rstart`/`a1gate`), per-ray azimuths, and the gain/offset
//! calibration loop are all transcribed from there. The teacher repo
//! carries no HDF5 dependency of its own; the `hdf5` crate's read-side
//! method surface (`File::open`, `Group::group`/`dataset`/`attr`,
//! `Dataset::read_1d`/`read_2d`) is taken from the pack's other HDF5
//! producers, generalized from writing to reading.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use hdf5::types::{FixedAscii, VarLenAscii};
use hdf5::Group;

use crate::constants::{DATA_UNAVAILABLE, MISSING_DATA, PRIMARY_DATA_NAME};
use crate::error::{RapioError, Result};
use crate::geospatial::radial_set::{AZIMUTH, BEAM_WIDTH};
use crate::geospatial::RadialSet;
use crate::grid::{Keys, Llh};
use crate::io::DataTypeHandle;

const NODATA_TOLERANCE: f64 = 0.005;
const MAX_AZIMUTH_SPACING_DEG: f64 = 1.5;
const CLAMPED_AZIMUTH_SPACING_DEG: f32 = 1.0;

/// (ODIM quantity, display name, stored/display units); unmapped
/// quantities fall back to `(quantity, "dBZ")` (spec §4.I).
const PRODUCT_INFO: &[(&str, &str, &str)] = &[
    ("DBZH", "Reflectivity", "dBZ"),
    ("DBZV", "Reflectivity", "dBZ"),
    ("TH", "Reflectivity", "dBZ"),
    ("TV", "Reflectivity", "dBZ"),
    ("VRAD", "Velocity", "MetersPerSecond"),
    ("VRADH", "Velocity", "MetersPerSecond"),
    ("WRAD", "SpectrumWidth", "MetersPerSecond"),
    ("ZDR", "Zdr", "dB"),
    ("RHOHV", "RhoHV", "Dimensionless"),
    ("PHIDP", "PhiDP", "Degrees"),
    ("KDP", "KDP", "DegreesPerKm"),
];

fn product_info(quantity: &str) -> (String, String) {
    PRODUCT_INFO
        .iter()
        .find(|(q, _, _)| *q == quantity)
        .map(|(_, name, units)| (name.to_string(), units.to_string()))
        .unwrap_or_else(|| (quantity.to_string(), "dBZ".to_string()))
}

/// Rotates a source ray index into its physical-order destination index
/// (spec §4.I a1gate convention): the stored ray at `i` is physically the
/// `a1gate`-th ray radiated, so it lands at `(i + a1gate) mod n`.
fn rotate_index(i: usize, a1gate: usize, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    (i + a1gate) % n
}

/// Absolute azimuth spacing between ray `i` and its successor, wrapping
/// the last ray against `360 + sa[0]`, clipped to 1 degree past 1.5
/// degrees. Returns `(spacing, was_clipped)`.
fn azimuth_spacing_at(sa: &[f64], i: usize, n: usize) -> (f32, bool) {
    if n == 0 {
        return (0.0, false);
    }
    let here = sa.get(i).copied().unwrap_or(0.0);
    let next = if i + 1 == n { sa.first().copied().unwrap_or(0.0) + 360.0 } else { sa.get(i + 1).copied().unwrap_or(0.0) };
    let spacing = (next - here).abs();
    if spacing > MAX_AZIMUTH_SPACING_DEG {
        (CLAMPED_AZIMUTH_SPACING_DEG, true)
    } else {
        (spacing as f32, false)
    }
}

fn attr_string(group: &Group, name: &str) -> Result<String> {
    let attr = group.attr(name)?;
    if let Ok(s) = attr.read_scalar::<VarLenAscii>() {
        return Ok(s.as_str().to_string());
    }
    attr.read_scalar::<FixedAscii<64>>().map(|s| s.as_str().to_string()).map_err(RapioError::from)
}

fn attr_f64(group: &Group, name: &str) -> Result<f64> {
    Ok(group.attr(name)?.read_scalar::<f64>()?)
}

fn attr_f64_or(group: &Group, name: &str, default: f64) -> f64 {
    attr_f64(group, name).unwrap_or(default)
}

fn attr_i64(group: &Group, name: &str) -> Result<i64> {
    Ok(group.attr(name)?.read_scalar::<i64>()?)
}

/// Extracts the `NOD:xxxx` token out of ODIM's comma-separated
/// `/what/source` (e.g. `"WMO:11038,NOD:atzuc,RAD:AT41"`).
fn parse_nod(source: &str) -> Option<String> {
    source.split(',').find_map(|tok| tok.trim().strip_prefix("NOD:").map(|s| s.to_string()))
}

fn parse_odim_time(date: &str, time: &str) -> Option<chrono::DateTime<Utc>> {
    let d = NaiveDate::parse_from_str(date, "%Y%m%d").ok()?;
    let t = NaiveTime::parse_from_str(time, "%H%M%S").ok()?;
    Some(Utc.from_utc_datetime(&d.and_time(t)))
}

/// Numerically-sorted child group names sharing `prefix` (e.g.
/// `"dataset1"`, `"dataset2"`, ... `"dataset10"` sorted as 1 < 2 < 10, not
/// lexically).
fn numbered_children(group: &Group, prefix: &str) -> Result<Vec<(usize, String)>> {
    let mut out: Vec<(usize, String)> = group
        .member_names()?
        .into_iter()
        .filter_map(|name| name.strip_prefix(prefix).and_then(|n| n.parse::<usize>().ok()).map(|n| (n, name)))
        .collect();
    out.sort_by_key(|(n, _)| *n);
    Ok(out)
}

/// Reads `/what/object` for the dispatcher's discriminator probe (spec
/// §4.H step 4). `Ok(None)` on any open/read failure -- an unreadable or
/// non-ODIM HDF5 file simply falls through to whatever generic reader is
/// registered (here, `read_odim` itself, since HDF5 has no non-ODIM
/// generic reader).
pub fn probe_object_tag(path: &str) -> Result<Option<String>> {
    let file = match hdf5::File::open(path) {
        Ok(f) => f,
        Err(_) => return Ok(None),
    };
    let what = match file.group("what") {
        Ok(g) => g,
        Err(_) => return Ok(None),
    };
    Ok(attr_string(&what, "object").ok())
}

/// Reads an ODIM SCAN or PVOL file into one or more `RadialSet`s (spec
/// §4.I). A PVOL with N datasets x M moments each yields N*M RadialSets,
/// bundled as `DataTypeHandle::Multi` when more than one results.
pub fn read_odim(keys: &Keys) -> Result<DataTypeHandle> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let file = hdf5::File::open(path)?;

    let root_what = file.group("what")?;
    let object = attr_string(&root_what, "object").unwrap_or_default();
    if object != "SCAN" && object != "PVOL" {
        tracing::warn!(target: "rapio::io", path, object = %object, "unrecognized ODIM /what/object, attempting dataset iteration anyway");
    }

    let root_where = file.group("where")?;
    let site_lat = attr_f64(&root_where, "lat")?;
    let site_lon = attr_f64(&root_where, "lon")?;
    let site_height_m = attr_f64(&root_where, "height")?;

    let source = attr_string(&root_what, "source").unwrap_or_default();
    let radar_name = parse_nod(&source);

    let root_time = {
        let date = attr_string(&root_what, "date").unwrap_or_default();
        let time = attr_string(&root_what, "time").unwrap_or_default();
        parse_odim_time(&date, &time).unwrap_or_else(Utc::now)
    };

    let dataset_names = numbered_children(&file, "dataset")?;
    if dataset_names.is_empty() {
        return Err(RapioError::semantic("ODIM file has no datasetN groups"));
    }

    let mut clipped_spacing_count = 0usize;
    let mut results: Vec<DataTypeHandle> = Vec::new();

    for (_, dataset_name) in &dataset_names {
        let ds_group = file.group(dataset_name)?;
        let ds_where = ds_group.group("where")?;
        let elangle = attr_f64(&ds_where, "elangle")? as f32;
        let nbins = attr_i64(&ds_where, "nbins")? as usize;
        let nrays = attr_i64(&ds_where, "nrays")? as usize;
        let rscale_m = attr_f64(&ds_where, "rscale")?;
        let rstart_km = attr_f64_or(&ds_where, "rstart", 0.0);
        let a1gate = if nrays > 0 { attr_i64(&ds_where, "a1gate").unwrap_or(0).max(0) as usize % nrays } else { 0 };

        let start_az: Vec<f64> = ds_where
            .dataset("startazA")
            .or_else(|_| ds_group.group("how").and_then(|h| h.dataset("startazA")))
            .and_then(|d| d.read_1d::<f64>())
            .map(|a| a.into_raw_vec())
            .unwrap_or_else(|_| vec![0.0; nrays]);

        let ds_what = ds_group.group("what").ok();
        let (ds_date, ds_time) = ds_what
            .as_ref()
            .map(|w| (attr_string(w, "startdate").unwrap_or_default(), attr_string(w, "starttime").unwrap_or_default()))
            .unwrap_or_default();
        let time = parse_odim_time(&ds_date, &ds_time).unwrap_or(root_time);

        let how = ds_group.group("how").or_else(|_| file.group("how")).ok();
        let beam_width_deg = how.as_ref().map(|h| attr_f64_or(h, "beamwidth", 1.0)).unwrap_or(1.0) as f32;

        let mut azimuth = vec![0.0f32; nrays];
        let mut azimuth_spacing = vec![0.0f32; nrays];
        for i in 0..nrays {
            let dest = rotate_index(i, a1gate, nrays);
            azimuth[dest] = start_az.get(i).copied().unwrap_or(0.0) as f32;
            let (spacing, clipped) = azimuth_spacing_at(&start_az, i, nrays);
            if clipped {
                clipped_spacing_count += 1;
            }
            azimuth_spacing[dest] = spacing;
        }

        let moment_names = numbered_children(&ds_group, "data")?;
        for (_, moment_name) in &moment_names {
            let data_group = ds_group.group(moment_name)?;
            let data_what = data_group.group("what")?;
            let quantity = attr_string(&data_what, "quantity").unwrap_or_else(|_| "UNKNOWN".to_string());
            let gain = attr_f64_or(&data_what, "gain", 1.0);
            let offset = attr_f64_or(&data_what, "offset", 0.0);
            let nodata = attr_f64_or(&data_what, "nodata", f64::NAN);
            let undetect = attr_f64_or(&data_what, "undetect", f64::NAN);

            let raw = data_group.dataset("data")?.read_2d::<f64>()?.into_raw_vec();
            if raw.len() != nrays * nbins {
                return Err(RapioError::corruption(format!(
                    "ODIM dataset '{}' moment '{}': expected {} values, found {}",
                    dataset_name,
                    moment_name,
                    nrays * nbins,
                    raw.len()
                )));
            }

            let (display_name, units) = product_info(&quantity);
            let center = Llh::new(site_lat, site_lon, site_height_m / 1000.0);
            let mut rs = RadialSet::create(
                display_name,
                units,
                center,
                time,
                elangle,
                (rstart_km * 1000.0) as f32,
                rscale_m as f32,
                nrays,
                nbins,
            )?;

            if let Some(name) = &radar_name {
                rs.set_radar_name(name.clone());
            }

            {
                let primary = rs.get_float1d_mut(PRIMARY_DATA_NAME).unwrap();
                for i in 0..nrays {
                    let dest = rotate_index(i, a1gate, nrays);
                    for b in 0..nbins {
                        let v = raw[i * nbins + b];
                        let calibrated = if (v - nodata).abs() <= NODATA_TOLERANCE {
                            DATA_UNAVAILABLE
                        } else if (v - undetect).abs() <= NODATA_TOLERANCE {
                            MISSING_DATA
                        } else {
                            gain * v + offset
                        };
                        primary.set(&[dest, b], calibrated as f32);
                    }
                }
            }
            rs.get_float1d_mut(AZIMUTH).unwrap().as_mut_slice().copy_from_slice(&azimuth);
            rs.get_float1d_mut(BEAM_WIDTH).unwrap().fill(beam_width_deg);
            rs.set_azimuth_spacing(azimuth_spacing.clone())?;

            results.push(DataTypeHandle::RadialSet(rs));
        }
    }

    if clipped_spacing_count > 0 {
        tracing::warn!(target: "rapio::io", path, count = clipped_spacing_count, "azimuth spacing exceeded 1.5 degrees, clipped to 1.0");
    }

    match results.len() {
        0 => Err(RapioError::semantic("ODIM file produced no moments")),
        1 => Ok(results.into_iter().next().unwrap()),
        _ => Ok(DataTypeHandle::Multi(results)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a1gate_rotation_matches_worked_example() {
        // scenario: a1gate=134, ray 0's startazA ends up at radial 134.
        assert_eq!(rotate_index(0, 134, 360), 134);
    }

    #[test]
    fn rotation_is_a_bijection_over_full_sweep() {
        let n = 360;
        let a1gate = 47;
        let mut seen = vec![false; n];
        for i in 0..n {
            seen[rotate_index(i, a1gate, n)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn azimuth_spacing_wraps_last_ray_against_360() {
        let sa = vec![0.0, 1.0, 2.0, 358.5];
        let (spacing, clipped) = azimuth_spacing_at(&sa, 3, 4);
        assert!((spacing - 1.5).abs() < 1e-6);
        assert!(!clipped);
    }

    #[test]
    fn azimuth_spacing_beyond_threshold_is_clipped() {
        let sa = vec![0.0, 5.0];
        let (spacing, clipped) = azimuth_spacing_at(&sa, 0, 2);
        assert!(clipped);
        assert_eq!(spacing, CLAMPED_AZIMUTH_SPACING_DEG);
    }

    #[test]
    fn unknown_quantity_defaults_to_dbz() {
        let (name, units) = product_info("XYZ");
        assert_eq!(name, "XYZ");
        assert_eq!(units, "dBZ");
    }

    #[test]
    fn known_quantity_is_remapped() {
        let (name, units) = product_info("VRAD");
        assert_eq!(name, "Velocity");
        assert_eq!(units, "MetersPerSecond");
    }

    #[test]
    fn nod_token_is_extracted_from_source() {
        assert_eq!(parse_nod("WMO:11038,NOD:atzuc,RAD:AT41"), Some("atzuc".to_string()));
        assert_eq!(parse_nod("WMO:11038"), None);
    }
}
