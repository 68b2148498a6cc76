//! Equirectangular grid in geographic coordinates (spec §4.E).

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::grid::{DataGrid, DataGridDimension, Keys, Llh, SparseLifecycle};
use crate::sparse::{self, GridShape};

/// A DataGrid with fixed dimension order {Lat, Lon}; `location` is the
/// northwest corner of cell (0, 0).
#[derive(Debug, Clone)]
pub struct LatLonGrid {
    grid: DataGrid,
    lat_spacing_deg: f32,
    lon_spacing_deg: f32,
}

impl Deref for LatLonGrid {
    type Target = DataGrid;
    fn deref(&self) -> &DataGrid {
        &self.grid
    }
}

impl DerefMut for LatLonGrid {
    fn deref_mut(&mut self) -> &mut DataGrid {
        &mut self.grid
    }
}

impl LatLonGrid {
    pub fn create(
        type_name: impl Into<String>,
        units: impl Into<String>,
        nw_corner: Llh,
        time: DateTime<Utc>,
        lat_spacing_deg: f32,
        lon_spacing_deg: f32,
        num_lats: usize,
        num_lons: usize,
    ) -> Result<Self> {
        let mut grid = DataGrid::new("LatLonGrid", type_name, nw_corner, time);
        grid.set_dims(vec![DataGridDimension::new("Lat", num_lats), DataGridDimension::new("Lon", num_lons)])?;
        grid.add_float_array(crate::constants::PRIMARY_DATA_NAME, units, vec![0, 1], vec![num_lats, num_lons])?;
        Ok(LatLonGrid { grid, lat_spacing_deg, lon_spacing_deg })
    }

    pub fn lat_spacing_deg(&self) -> f32 {
        self.lat_spacing_deg
    }

    pub fn lon_spacing_deg(&self) -> f32 {
        self.lon_spacing_deg
    }

    pub fn num_lats(&self) -> usize {
        self.grid.dim_index("Lat").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn num_lons(&self) -> usize {
        self.grid.dim_index("Lon").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn num_layers(&self) -> usize {
        1
    }

    /// Single layer's height in meters (the grid's own location height).
    pub fn layer_value(&self, layer: usize) -> f64 {
        debug_assert_eq!(layer, 0);
        self.grid.location().height_km * 1000.0
    }

    fn shape(&self) -> GridShape {
        GridShape::two_d(self.num_lats(), self.num_lons())
    }

    /// Rehydrates a `LatLonGrid` around a generic `DataGrid` a NetCDF read
    /// already populated (spec §4.I "thin wrappers around the generic
    /// DataGrid reader").
    pub fn from_grid(grid: DataGrid, lat_spacing_deg: f32, lon_spacing_deg: f32) -> Self {
        LatLonGrid { grid, lat_spacing_deg, lon_spacing_deg }
    }

    /// Borrowed view of the backing `DataGrid` (spec §4.I writers clone
    /// before stamping format-specific attributes).
    pub fn grid_ref(&self) -> &DataGrid {
        &self.grid
    }
}

impl SparseLifecycle for LatLonGrid {
    fn post_read(&mut self, keys: &Keys) -> Result<()> {
        sparse::unsparse(&mut self.grid, self.shape(), keys)?;
        Ok(())
    }

    fn pre_write(&mut self, keys: &Keys) -> Result<()> {
        if keys.get("MakeSparse").map(|v| v == "on").unwrap_or(false) {
            sparse::sparsify(&mut self.grid, self.shape())?;
        }
        Ok(())
    }

    fn post_write(&mut self, _keys: &Keys) -> Result<()> {
        sparse::unsparse_restore(&mut self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_sets_up_primary_array() {
        let g = LatLonGrid::create("Reflectivity", "dBZ", Llh::new(40.0, -100.0, 1.0), Utc::now(), 0.01, 0.01, 10, 20)
            .unwrap();
        assert_eq!(g.num_lats(), 10);
        assert_eq!(g.num_lons(), 20);
        assert_eq!(g.num_layers(), 1);
    }

    #[test]
    fn empty_grid_has_zero_dims_without_allocation() {
        let g = LatLonGrid::create("X", "dBZ", Llh::new(0.0, 0.0, 0.0), Utc::now(), 1.0, 1.0, 0, 0).unwrap();
        assert_eq!(g.num_lats(), 0);
        assert_eq!(g.num_lons(), 0);
    }
}
