//! Polar radar sweep: azimuth x range at a fixed elevation (spec §4.E).

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};

use crate::array::Array;
use crate::error::Result;
use crate::grid::{DataGrid, DataGridDimension, Keys, Llh, SparseLifecycle};
use crate::sparse::{self, GridShape};

pub const AZIMUTH: &str = "Azimuth";
pub const BEAM_WIDTH: &str = "BeamWidth";
pub const GATE_WIDTH: &str = "GateWidth";
pub const AZIMUTH_SPACING: &str = "AzimuthSpacing";

/// A DataGrid with fixed dimension order {Azimuth, Gate}.
#[derive(Debug, Clone)]
pub struct RadialSet {
    grid: DataGrid,
    elevation_deg: f32,
    first_gate_range_m: f32,
    gate_width_m: f32,
}

impl Deref for RadialSet {
    type Target = DataGrid;
    fn deref(&self) -> &DataGrid {
        &self.grid
    }
}

impl DerefMut for RadialSet {
    fn deref_mut(&mut self) -> &mut DataGrid {
        &mut self.grid
    }
}

impl RadialSet {
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        type_name: impl Into<String>,
        units: impl Into<String>,
        center: Llh,
        time: DateTime<Utc>,
        elevation_deg: f32,
        first_gate_range_m: f32,
        gate_width_m: f32,
        num_radials: usize,
        num_gates: usize,
    ) -> Result<Self> {
        let mut grid = DataGrid::new("RadialSet", type_name, center, time);
        grid.set_dims(vec![DataGridDimension::new("Azimuth", num_radials), DataGridDimension::new("Gate", num_gates)])?;
        grid.add_float_array(crate::constants::PRIMARY_DATA_NAME, units, vec![0, 1], vec![num_radials, num_gates])?;
        grid.add_float_array(AZIMUTH, "Degrees", vec![0], vec![num_radials])?;
        grid.add_float_array(BEAM_WIDTH, "Degrees", vec![0], vec![num_radials])?;
        grid.add_float_array(GATE_WIDTH, "Meters", vec![0], vec![num_radials])?;
        let mut rs = RadialSet { grid, elevation_deg, first_gate_range_m, gate_width_m };
        rs.grid.get_float1d_mut(GATE_WIDTH).unwrap().fill(gate_width_m);
        Ok(rs)
    }

    pub fn elevation_deg(&self) -> f32 {
        self.elevation_deg
    }

    pub fn first_gate_range_m(&self) -> f32 {
        self.first_gate_range_m
    }

    pub fn gate_width_m(&self) -> f32 {
        self.gate_width_m
    }

    /// Legacy millidegree encoding preserved for indexing compatibility
    /// with the original single-layer API (spec §4.E).
    pub fn layer_value(&self, layer: usize) -> f32 {
        debug_assert_eq!(layer, 0, "RadialSet has a single layer");
        self.elevation_deg * 1000.0
    }

    pub fn num_radials(&self) -> usize {
        self.grid.dim_index("Azimuth").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn num_gates(&self) -> usize {
        self.grid.dim_index("Gate").map(|i| self.grid.dims()[i].size).unwrap_or(0)
    }

    pub fn azimuth(&self) -> Option<&Array<f32>> {
        self.grid.get_float1d(AZIMUTH)
    }

    pub fn beam_width(&self) -> Option<&Array<f32>> {
        self.grid.get_float1d(BEAM_WIDTH)
    }

    pub fn gate_width(&self) -> Option<&Array<f32>> {
        self.grid.get_float1d(GATE_WIDTH)
    }

    /// Per-radial azimuth spacing is optional (spec §4.E); allocated lazily
    /// by readers/writers that actually have it (e.g. the ODIM
    /// specializer).
    pub fn set_azimuth_spacing(&mut self, spacing: Vec<f32>) -> Result<()> {
        let n = self.num_radials();
        debug_assert_eq!(spacing.len(), n);
        self.grid.add_array(crate::data_array::DataArray::new(
            AZIMUTH_SPACING,
            "Degrees",
            vec![0],
            Array::from_flat(vec![n], spacing),
        ))
    }

    pub fn azimuth_spacing(&self) -> Option<&Array<f32>> {
        self.grid.get_float1d(AZIMUTH_SPACING)
    }

    /// Optional Nyquist velocity in m/s (spec §4.E).
    pub fn set_nyquist_velocity(&mut self, nyquist_ms: f64) {
        self.grid.attributes_mut().put_double("Nyquist_Vel-value", nyquist_ms);
    }

    pub fn nyquist_velocity(&self) -> Option<f64> {
        self.grid.attributes().get_double("Nyquist_Vel-value").ok().flatten()
    }

    /// Optional volume coverage pattern number.
    pub fn set_vcp(&mut self, vcp: i64) {
        self.grid.attributes_mut().put_long("VCP-value", vcp);
    }

    pub fn vcp(&self) -> Option<i64> {
        self.grid.attributes().get_long("VCP-value").ok().flatten()
    }

    /// Optional radar site name/identifier.
    pub fn set_radar_name(&mut self, name: impl Into<String>) {
        self.grid.attributes_mut().put_string("radarName-value", name.into());
    }

    pub fn radar_name(&self) -> Option<String> {
        self.grid.attributes().get_string("radarName-value").ok().flatten()
    }

    fn shape(&self) -> GridShape {
        GridShape::two_d(self.num_radials(), self.num_gates())
    }

    /// Rehydrates a `RadialSet` around a generic `DataGrid` a NetCDF read
    /// already populated (spec §4.I "thin wrappers around the generic
    /// DataGrid reader").
    pub fn from_grid(grid: DataGrid, elevation_deg: f32, first_gate_range_m: f32, gate_width_m: f32) -> Self {
        RadialSet { grid, elevation_deg, first_gate_range_m, gate_width_m }
    }

    /// Borrowed view of the backing `DataGrid`, used by writers that need
    /// to clone it before stamping format-specific attributes onto the
    /// clone (spec §4.I).
    pub fn grid_ref(&self) -> &DataGrid {
        &self.grid
    }
}

impl SparseLifecycle for RadialSet {
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
    fn create_allocates_per_radial_arrays() {
        let rs = RadialSet::create("Reflectivity", "dBZ", Llh::new(35.0, -97.0, 0.4), Utc::now(), 0.5, 1000.0, 250.0, 360, 1000)
            .unwrap();
        assert_eq!(rs.num_radials(), 360);
        assert_eq!(rs.num_gates(), 1000);
        assert_eq!(rs.azimuth().unwrap().len(), 360);
        assert_eq!(rs.layer_value(0), 500.0);
    }

    #[test]
    fn single_radial_single_gate_round_trips() {
        let mut rs =
            RadialSet::create("Reflectivity", "dBZ", Llh::new(0.0, 0.0, 0.0), Utc::now(), 1.0, 0.0, 250.0, 1, 1).unwrap();
        rs.get_float1d_mut(crate::constants::PRIMARY_DATA_NAME).unwrap().set(&[0, 0], 12.0);
        let keys = Keys::new();
        rs.pre_write(&keys).unwrap();
        rs.post_write(&keys).unwrap();
        assert_eq!(rs.get_float1d(crate::constants::PRIMARY_DATA_NAME).unwrap().get(&[0, 0]), 12.0);
    }
}
