//! Three-dimensional layered equirectangular grid (spec §4.E).

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};

use crate::array::Array;
use crate::error::Result;
use crate::grid::{DataGrid, DataGridDimension, Keys, Llh, SparseLifecycle};
use crate::sparse::{self, GridShape};

/// A DataGrid with fixed dimension order {Ht, Lat, Lon}. Layer heights
/// (meters, ascending) live in the 1-D `Height` array.
#[derive(Debug, Clone)]
pub struct LatLonHeightGrid {
    grid: DataGrid,
    lat_spacing_deg: f32,
    lon_spacing_deg: f32,
}

impl Deref for LatLonHeightGrid {
    type Target = DataGrid;
    fn deref(&self) -> &DataGrid {
        &self.grid
    }
}

impl DerefMut for LatLonHeightGrid {
    fn deref_mut(&mut self) -> &mut DataGrid {
        &mut self.grid
    }
}

impl LatLonHeightGrid {
    pub fn create(
        type_name: impl Into<String>,
        units: impl Into<String>,
        nw_corner: Llh,
        time: DateTime<Utc>,
        lat_spacing_deg: f32,
        lon_spacing_deg: f32,
        heights_m: Vec<f32>,
        num_lats: usize,
        num_lons: usize,
    ) -> Result<Self> {
        let num_heights = heights_m.len();
        let mut grid = DataGrid::new("LatLonHeightGrid", type_name, nw_corner, time);
        grid.set_dims(vec![
            DataGridDimension::new("Ht", num_heights),
            DataGridDimension::new("Lat", num_lats),
            DataGridDimension::new("Lon", num_lons),
        ])?;
        grid.add_float_array(
            crate::constants::PRIMARY_DATA_NAME,
            units,
            vec![0, 1, 2],
            vec![num_heights, num_lats, num_lons],
        )?;
        grid.add_array(crate::data_array::DataArray::new("Height", "Meters", vec![0], Array::from_flat(vec![num_heights], heights_m)))?;
        Ok(LatLonHeightGrid { grid, lat_spacing_deg, lon_spacing_deg })
    }

    pub fn lat_spacing_deg(&self) -> f32 {
        self.lat_spacing_deg
    }

    pub fn lon_spacing_deg(&self) -> f32 {
        self.lon_spacing_deg
    }

    pub fn num_heights(&self) -> usize {
        self.grid.dim_index("Ht").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn num_lats(&self) -> usize {
        self.grid.dim_index("Lat").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn num_lons(&self) -> usize {
        self.grid.dim_index("Lon").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn heights_m(&self) -> Option<&Array<f32>> {
        self.grid.get_float1d("Height")
    }

    fn shape(&self) -> GridShape {
        // x=Lat, y=Lon (row-major within a height plane), z=Ht (outermost
        // plane index), matching the primary array's stored [Ht, Lat, Lon]
        // order -- see sparse.rs's 3-D indexing convention.
        GridShape::three_d(self.num_lats(), self.num_lons(), self.num_heights())
    }

    /// Rehydrates a `LatLonHeightGrid` around a generic `DataGrid` a NetCDF
    /// read already populated (spec §4.I).
    pub fn from_grid(grid: DataGrid, lat_spacing_deg: f32, lon_spacing_deg: f32) -> Self {
        LatLonHeightGrid { grid, lat_spacing_deg, lon_spacing_deg }
    }

    pub fn grid_ref(&self) -> &DataGrid {
        &self.grid
    }
}

impl SparseLifecycle for LatLonHeightGrid {
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
    fn create_stores_ascending_heights() {
        let g = LatLonHeightGrid::create(
            "MergedReflectivityQC",
            "dBZ",
            Llh::new(40.0, -100.0, 0.0),
            Utc::now(),
            0.01,
            0.01,
            vec![500.0, 1000.0, 1500.0],
            5,
            5,
        )
        .unwrap();
        assert_eq!(g.num_heights(), 3);
        assert_eq!(g.heights_m().unwrap().as_slice(), &[500.0, 1000.0, 1500.0]);
    }
}
