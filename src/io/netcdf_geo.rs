//! Thin NetCDF RadialSet/LatLonGrid/LatLonHeightGrid wrappers (spec §4.I):
//! delegate to the generic reader/writer, then enforce dimension ordering
//! and rehydrate the geospatial type-specific fields the generic DataGrid
//! doesn't know about (elevation, gate geometry, lat/lon spacing).

use crate::error::{RapioError, Result};
use crate::geospatial::{LatLonGrid, LatLonHeightGrid, RadialSet};
use crate::grid::{DataGrid, Keys};
use crate::io::netcdf_generic;
use crate::io::DataTypeHandle;

const ELEVATION_DEG: &str = "Elevation";
const GATE_WIDTH_M: &str = "GateWidthResolution";
const FIRST_GATE_RANGE_M: &str = "RangeToFirstGate";
const LAT_SPACING: &str = "LatGridSpacing";
const LON_SPACING: &str = "LonGridSpacing";

fn require_dims(grid: &DataGrid, expected: &[&str]) -> Result<()> {
    let names: Vec<&str> = grid.dims().iter().map(|d| d.name.as_str()).collect();
    if names != expected {
        return Err(RapioError::semantic(format!(
            "expected dimension order {expected:?}, found {names:?}"
        )));
    }
    Ok(())
}

pub fn read_radial_set(keys: &Keys) -> Result<DataTypeHandle> {
    let generic = netcdf_generic::read_generic(keys)?;
    let grid = match generic {
        DataTypeHandle::Grid(g) => g,
        other => return Ok(other),
    };
    require_dims(&grid, &["Azimuth", "Gate"])?;

    let elevation_deg = grid.attributes().get_double(ELEVATION_DEG)?.unwrap_or(0.0) as f32;
    let first_gate_range_m = grid.attributes().get_double(FIRST_GATE_RANGE_M)?.unwrap_or(0.0) as f32;
    let gate_width_fallback = grid
        .get_float1d("GateWidth")
        .map(|a| a.as_slice().first().copied().unwrap_or(0.0))
        .unwrap_or(0.0);
    let gate_width_m = grid.attributes().get_double(GATE_WIDTH_M)?.unwrap_or(gate_width_fallback as f64) as f32;

    let rs = RadialSet::from_grid(grid, elevation_deg, first_gate_range_m, gate_width_m);
    Ok(DataTypeHandle::RadialSet(rs))
}

pub fn write_radial_set(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let deflate = keys.get("deflate_level").and_then(|s| s.parse().ok()).unwrap_or(6);
    let rs = match dt {
        DataTypeHandle::RadialSet(rs) => rs,
        _ => return Err(RapioError::semantic("RadialSet writer requires a RadialSet")),
    };
    let mut grid = rs.grid_ref().clone();
    grid.attributes_mut().put_double(ELEVATION_DEG, rs.elevation_deg() as f64);
    grid.attributes_mut().put_double(FIRST_GATE_RANGE_M, rs.first_gate_range_m() as f64);
    grid.attributes_mut().put_double(GATE_WIDTH_M, rs.gate_width_m() as f64);
    netcdf_generic::write_generic_to(&grid, path, deflate)
}

pub fn read_latlon_grid(keys: &Keys) -> Result<DataTypeHandle> {
    let generic = netcdf_generic::read_generic(keys)?;
    let grid = match generic {
        DataTypeHandle::Grid(g) => g,
        other => return Ok(other),
    };
    require_dims(&grid, &["Lat", "Lon"])?;
    let lat_spacing = grid.attributes().get_double(LAT_SPACING)?.unwrap_or(0.01) as f32;
    let lon_spacing = grid.attributes().get_double(LON_SPACING)?.unwrap_or(0.01) as f32;
    Ok(DataTypeHandle::LatLonGrid(LatLonGrid::from_grid(grid, lat_spacing, lon_spacing)))
}

pub fn write_latlon_grid(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let deflate = keys.get("deflate_level").and_then(|s| s.parse().ok()).unwrap_or(6);
    let llg = match dt {
        DataTypeHandle::LatLonGrid(g) => g,
        _ => return Err(RapioError::semantic("LatLonGrid writer requires a LatLonGrid")),
    };
    let mut grid = llg.grid_ref().clone();
    grid.attributes_mut().put_double(LAT_SPACING, llg.lat_spacing_deg() as f64);
    grid.attributes_mut().put_double(LON_SPACING, llg.lon_spacing_deg() as f64);
    netcdf_generic::write_generic_to(&grid, path, deflate)
}

pub fn read_latlon_height_grid(keys: &Keys) -> Result<DataTypeHandle> {
    let generic = netcdf_generic::read_generic(keys)?;
    let grid = match generic {
        DataTypeHandle::Grid(g) => g,
        other => return Ok(other),
    };
    require_dims(&grid, &["Ht", "Lat", "Lon"])?;
    let lat_spacing = grid.attributes().get_double(LAT_SPACING)?.unwrap_or(0.01) as f32;
    let lon_spacing = grid.attributes().get_double(LON_SPACING)?.unwrap_or(0.01) as f32;
    Ok(DataTypeHandle::LatLonHeightGrid(LatLonHeightGrid::from_grid(grid, lat_spacing, lon_spacing)))
}

pub fn write_latlon_height_grid(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let deflate = keys.get("deflate_level").and_then(|s| s.parse().ok()).unwrap_or(6);
    let llhg = match dt {
        DataTypeHandle::LatLonHeightGrid(g) => g,
        _ => return Err(RapioError::semantic("LatLonHeightGrid writer requires a LatLonHeightGrid")),
    };
    let mut grid = llhg.grid_ref().clone();
    grid.attributes_mut().put_double(LAT_SPACING, llhg.lat_spacing_deg() as f64);
    grid.attributes_mut().put_double(LON_SPACING, llhg.lon_spacing_deg() as f64);
    netcdf_generic::write_generic_to(&grid, path, deflate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DataGridDimension, Llh};
    use chrono::Utc;

    #[test]
    fn dimension_order_mismatch_is_rejected() {
        let mut g = DataGrid::new("RadialSet", "R", Llh::new(0.0, 0.0, 0.0), Utc::now());
        g.set_dims(vec![DataGridDimension::new("Gate", 1), DataGridDimension::new("Azimuth", 1)]).unwrap();
        assert!(require_dims(&g, &["Azimuth", "Gate"]).is_err());
    }
}
