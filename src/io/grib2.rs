//! GRIB2 specializer (spec §4.I): catalog print, fetch-by-(product,level)
//! as a native 2-D grid, and nearest-neighbor projection onto a
//! `LatLonGrid`.
//!
//! Grounded in `fullscreen-triangle-Buhera-West`'s `grib = "0.7"`
//! dependency: the teacher has no GRIB2 reader and no wgrib2 FFI crate
//! exists anywhere in the corpus, so the `grib` crate's own message
//! iterator (`grib::from_reader`, per-submessage `describe`/`latlons`/
//! decode) stands in for the callback-bridge approach spec.md describes,
//! noted as a substitution in DESIGN.md.

use std::fs::File;
use std::io::BufReader;

use crate::constants::{DATA_UNAVAILABLE, MISSING_DATA, PRIMARY_DATA_NAME};
use crate::error::{RapioError, Result};
use crate::geospatial::LatLonGrid;
use crate::grid::{DataGrid, DataGridDimension, Keys, Llh};
use crate::io::DataTypeHandle;

/// One GRIB2 message, decoded into (lat, lon, value) triples in scan
/// order -- the crate's own coordinate iterator sidesteps needing to
/// parse the grid definition template's projection parameters ourselves.
struct NativeGrid {
    description: String,
    points: Vec<(f64, f64, f32)>,
}

fn open_entries(path: &str) -> Result<Vec<NativeGrid>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let grib2 = grib::from_reader(reader).map_err(|e| RapioError::Grib(e.to_string()))?;

    let mut entries = Vec::new();
    for (_, submessage) in grib2.iter() {
        let description = submessage.describe();
        let decoder = match grib::Grib2SubmessageDecoder::from(submessage) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!(target: "rapio::io", path, error = %e, "skipping undecodable GRIB2 submessage");
                continue;
            }
        };
        let values = match decoder.dispatch() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "rapio::io", path, error = %e, "skipping undecodable GRIB2 submessage");
                continue;
            }
        };
        let latlons = match submessage.latlons() {
            Ok(it) => it,
            Err(e) => {
                tracing::warn!(target: "rapio::io", path, error = %e, "submessage has no coordinate iterator, skipping");
                continue;
            }
        };
        let points: Vec<(f64, f64, f32)> =
            latlons.zip(values).map(|((lat, lon), v)| (lat as f64, lon as f64, v)).collect();
        entries.push(NativeGrid { description, points });
    }
    Ok(entries)
}

/// Finds the first entry whose description mentions both `product` and
/// `level` (case-insensitive substring match -- spec.md leaves the exact
/// match algorithm unspecified beyond "matched by (product, level)
/// strings").
fn find_entry<'a>(entries: &'a [NativeGrid], product: &str, level: &str) -> Option<&'a NativeGrid> {
    let product = product.to_ascii_lowercase();
    let level = level.to_ascii_lowercase();
    entries.iter().find(|e| {
        let d = e.description.to_ascii_lowercase();
        d.contains(&product) && d.contains(&level)
    })
}

/// Nearest-neighbor lookup, `None` when `(lat, lon)` falls outside the
/// native grid's bounding box (spec §4.I "index 0 -> DataUnavailable" for
/// the "not found" sentinel).
fn nearest(points: &[(f64, f64, f32)], lat: f64, lon: f64, bbox: (f64, f64, f64, f64)) -> Option<f32> {
    let (min_lat, max_lat, min_lon, max_lon) = bbox;
    if lat < min_lat || lat > max_lat || lon < min_lon || lon > max_lon {
        return None;
    }
    points
        .iter()
        .min_by(|(la, lo, _), (lb, lob, _)| {
            let da = (la - lat).powi(2) + (lo - lon).powi(2);
            let db = (lb - lat).powi(2) + (lob - lon).powi(2);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, _, v)| *v)
}

fn bbox_of(points: &[(f64, f64, f32)]) -> (f64, f64, f64, f64) {
    points.iter().fold((f64::MAX, f64::MIN, f64::MAX, f64::MIN), |(mn_la, mx_la, mn_lo, mx_lo), &(la, lo, _)| {
        (mn_la.min(la), mx_la.max(la), mn_lo.min(lo), mx_lo.max(lo))
    })
}

/// Projects a native GRIB2 grid onto a regular lat/lon grid whose
/// northwest corner, per-cell spacing, and cell counts the caller
/// supplies (spec §8 scenario 4).
fn project(
    native: &NativeGrid,
    nw: Llh,
    lat_spacing_deg: f32,
    lon_spacing_deg: f32,
    num_lats: usize,
    num_lons: usize,
    time: chrono::DateTime<chrono::Utc>,
    type_name: &str,
    units: &str,
) -> Result<LatLonGrid> {
    let mut dest = LatLonGrid::create(type_name, units, nw, time, lat_spacing_deg, lon_spacing_deg, num_lats, num_lons)?;
    let bbox = bbox_of(&native.points);
    let primary = dest.get_float1d_mut(PRIMARY_DATA_NAME).unwrap();
    for row in 0..num_lats {
        let lat = nw.latitude_deg - (row as f64) * (lat_spacing_deg as f64);
        for col in 0..num_lons {
            let lon = nw.longitude_deg + (col as f64) * (lon_spacing_deg as f64);
            let value = match nearest(&native.points, lat, lon, bbox) {
                None => DATA_UNAVAILABLE as f32,
                Some(v) if v.is_nan() => MISSING_DATA as f32,
                Some(v) => v,
            };
            primary.set(&[row, col], value);
        }
    }
    Ok(dest)
}

/// Catalog/fetch/project entry point (spec §4.H generic reader for
/// GRIB2, which has no discriminator attribute and is treated as a
/// whole-file catalog).
///
/// Keys recognized: `grib_product` / `grib_level` select a message;
/// `nw_lat`/`nw_lon`/`lat_spacing_deg`/`lon_spacing_deg`/`num_lats`/
/// `num_lons` additionally request a projection onto a `LatLonGrid`.
/// Without `grib_product`/`grib_level`, the catalog is logged and the
/// read fails (there is no single DataType to hand back for a whole
/// catalog).
pub fn read_catalog(keys: &Keys) -> Result<DataTypeHandle> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let entries = open_entries(path)?;

    let (product, level) = match (keys.get("grib_product"), keys.get("grib_level")) {
        (Some(p), Some(l)) => (p.clone(), l.clone()),
        _ => {
            for (i, e) in entries.iter().enumerate() {
                tracing::info!(target: "rapio::io", path, index = i, description = %e.description, "GRIB2 catalog entry");
            }
            return Err(RapioError::semantic("GRIB2 read requires 'grib_product' and 'grib_level' keys to select a message"));
        }
    };

    let entry = find_entry(&entries, &product, &level)
        .ok_or_else(|| RapioError::semantic(format!("no GRIB2 message matching product '{}' level '{}'", product, level)))?;

    let time = chrono::Utc::now();

    match (
        keys.get("nw_lat"),
        keys.get("nw_lon"),
        keys.get("lat_spacing_deg"),
        keys.get("lon_spacing_deg"),
        keys.get("num_lats"),
        keys.get("num_lons"),
    ) {
        (Some(nw_lat), Some(nw_lon), Some(dlat), Some(dlon), Some(nlat), Some(nlon)) => {
            let nw = Llh::new(nw_lat.parse().unwrap_or(0.0), nw_lon.parse().unwrap_or(0.0), 0.0);
            let lat_spacing: f32 = dlat.parse().unwrap_or(0.01);
            let lon_spacing: f32 = dlon.parse().unwrap_or(0.01);
            let num_lats: usize = nlat.parse().unwrap_or(0);
            let num_lons: usize = nlon.parse().unwrap_or(0);
            let grid =
                project(entry, nw, lat_spacing, lon_spacing, num_lats, num_lons, time, &product, "Dimensionless")?;
            Ok(DataTypeHandle::LatLonGrid(grid))
        }
        _ => {
            // No projection requested: hand back the native point set as
            // a catalog-ordered 1-D DataGrid (x = point index).
            let mut grid = DataGrid::new("DataGrid", product.clone(), Llh::new(0.0, 0.0, 0.0), time);
            grid.set_dims(vec![DataGridDimension::new("Point", entry.points.len())])?;
            grid.add_float_array(PRIMARY_DATA_NAME, "Dimensionless", vec![0], vec![entry.points.len()])?;
            let primary = grid.get_float1d_mut(PRIMARY_DATA_NAME).unwrap();
            for (i, &(_, _, v)) in entry.points.iter().enumerate() {
                primary.set(&[i], v);
            }
            Ok(DataTypeHandle::Grid(grid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_neighbor_picks_closest_point() {
        let points = vec![(40.0, -100.0, 1.0), (40.1, -100.0, 2.0), (39.0, -99.0, 3.0)];
        let bbox = bbox_of(&points);
        let v = nearest(&points, 40.02, -100.0, bbox).unwrap();
        assert_eq!(v, 1.0);
    }

    #[test]
    fn outside_bbox_is_not_found() {
        let points = vec![(40.0, -100.0, 1.0), (40.1, -100.0, 2.0)];
        let bbox = bbox_of(&points);
        assert!(nearest(&points, 80.0, -100.0, bbox).is_none());
    }

    #[test]
    fn entry_match_is_case_insensitive_substring() {
        let entries = vec![NativeGrid { description: "Reflectivity at Surface".to_string(), points: vec![] }];
        assert!(find_entry(&entries, "reflectivity", "surface").is_some());
        assert!(find_entry(&entries, "velocity", "surface").is_none());
    }
}
