//! Dimension table + collection of DataArrays + global attributes
//! (spec §4.D), plus the lifecycle hooks the sparse codec and I/O
//! dispatch call through (`SparseLifecycle`, grounded in
//! `original_source/base/datatype/rLatLonGrid.cc`'s `postRead`/
//! `preWrite`/`postWrite`).

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

use crate::array::ArrayData;
use crate::attribute::DataAttributeList;
use crate::constants::PRIMARY_DATA_NAME;
use crate::data_array::DataArray;
use crate::error::{RapioError, Result};

/// Geographic location of a DataGrid: latitude/longitude in degrees,
/// height in kilometers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Llh {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub height_km: f64,
}

impl Llh {
    pub fn new(latitude_deg: f64, longitude_deg: f64, height_km: f64) -> Self {
        Llh { latitude_deg, longitude_deg, height_km }
    }
}

/// A single named dimension in a DataGrid's dimension table. Sizes are
/// positive; names are unique within the owning grid; the table is
/// immutable after the grid's first `set_dims` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DataGridDimension {
    pub name: String,
    pub size: usize,
}

impl DataGridDimension {
    pub fn new(name: impl Into<String>, size: usize) -> Self {
        DataGridDimension { name: name.into(), size }
    }
}

/// Keys passed between the I/O dispatch and a specializer / lifecycle
/// hook (spec §4.H "Keys map", §6).
pub type Keys = HashMap<String, String>;

/// The `postRead` / `preWrite` / `postWrite` seam the sparse codec and
/// the I/O dispatch drive. The base `DataGrid` implementation is a
/// no-op; geospatial specializations with a sparsifiable primary array
/// override it.
pub trait SparseLifecycle {
    fn post_read(&mut self, _keys: &Keys) -> Result<()> {
        Ok(())
    }

    fn pre_write(&mut self, _keys: &Keys) -> Result<()> {
        Ok(())
    }

    fn post_write(&mut self, _keys: &Keys) -> Result<()> {
        Ok(())
    }
}

/// Named dimension table + ordered DataArrays + global attributes,
/// shared by every DataType. Exactly one DataArray is *primary* (named
/// `PRIMARY_DATA_NAME` in memory; renamed to `type_name` on disk).
#[derive(Debug, Clone)]
pub struct DataGrid {
    data_type_tag: String,
    type_name: String,
    location: Llh,
    time: DateTime<Utc>,
    fractional_seconds: f64,
    read_factory: String,
    dims: Vec<DataGridDimension>,
    dims_locked: bool,
    arrays: Vec<DataArray>,
    attributes: DataAttributeList,
}

impl DataGrid {
    pub fn new(
        data_type_tag: impl Into<String>,
        type_name: impl Into<String>,
        location: Llh,
        time: DateTime<Utc>,
    ) -> Self {
        DataGrid {
            data_type_tag: data_type_tag.into(),
            type_name: type_name.into(),
            location,
            time,
            fractional_seconds: 0.0,
            read_factory: String::new(),
            dims: Vec::new(),
            dims_locked: false,
            arrays: Vec::new(),
            attributes: DataAttributeList::new(),
        }
    }

    pub fn data_type_tag(&self) -> &str {
        &self.data_type_tag
    }

    pub fn set_data_type_tag(&mut self, tag: impl Into<String>) {
        self.data_type_tag = tag.into();
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn set_type_name(&mut self, type_name: impl Into<String>) {
        self.type_name = type_name.into();
    }

    pub fn location(&self) -> Llh {
        self.location
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn fractional_seconds(&self) -> f64 {
        self.fractional_seconds
    }

    pub fn read_factory(&self) -> &str {
        &self.read_factory
    }

    pub fn set_read_factory(&mut self, tag: impl Into<String>) {
        self.read_factory = tag.into();
    }

    pub fn dims(&self) -> &[DataGridDimension] {
        &self.dims
    }

    pub fn dim_index(&self, name: &str) -> Option<usize> {
        self.dims.iter().position(|d| d.name == name)
    }

    /// Direct mutable access to the dimension table, bypassing the
    /// "locked after first set_dims" check. Restricted to the crate so
    /// only the sparse codec's narrow `pixel`-dimension carve-out (see
    /// `sparse.rs`) can use it.
    pub(crate) fn dims_mut(&mut self) -> &mut Vec<DataGridDimension> {
        &mut self.dims
    }

    /// Sets the dimension table. Fatal (duplicate dimension name) or
    /// called a second time after the table has been locked.
    pub fn set_dims(&mut self, dims: Vec<DataGridDimension>) -> Result<()> {
        if self.dims_locked {
            return Err(RapioError::semantic("dimension table is immutable after first set_dims"));
        }
        let mut seen = std::collections::HashSet::new();
        for d in &dims {
            if !seen.insert(d.name.clone()) {
                return Err(RapioError::semantic(format!("duplicate dimension name '{}'", d.name)));
            }
        }
        self.dims = dims;
        self.dims_locked = true;
        Ok(())
    }

    /// Registers `array`, replacing any prior array of the same name.
    /// Fatal if `array`'s dim_indexes reference dimensions outside the
    /// table.
    pub fn add_array(&mut self, array: DataArray) -> Result<()> {
        for &idx in array.dim_indexes() {
            if idx >= self.dims.len() {
                return Err(RapioError::semantic(format!(
                    "array '{}' references unknown dimension index {}",
                    array.name(),
                    idx
                )));
            }
        }
        if let Some(shape) = array_shape_matches(&array, &self.dims) {
            if !shape {
                return Err(RapioError::semantic(format!(
                    "array '{}' shape does not match referenced dimension sizes",
                    array.name()
                )));
            }
        }
        if let Some(pos) = self.arrays.iter().position(|a| a.name() == array.name()) {
            self.arrays[pos] = array;
        } else {
            self.arrays.push(array);
        }
        Ok(())
    }

    pub fn get_node(&self, name: &str) -> Option<&DataArray> {
        self.arrays.iter().find(|a| a.name() == name)
    }

    pub fn get_node_mut(&mut self, name: &str) -> Option<&mut DataArray> {
        self.arrays.iter_mut().find(|a| a.name() == name)
    }

    pub fn get_arrays(&self) -> &[DataArray] {
        &self.arrays
    }

    pub fn get_arrays_mut(&mut self) -> &mut [DataArray] {
        &mut self.arrays
    }

    pub fn remove_array(&mut self, name: &str) -> Option<DataArray> {
        let pos = self.arrays.iter().position(|a| a.name() == name)?;
        Some(self.arrays.remove(pos))
    }

    pub fn primary(&self) -> Option<&DataArray> {
        self.get_node(PRIMARY_DATA_NAME)
    }

    pub fn primary_mut(&mut self) -> Option<&mut DataArray> {
        self.get_node_mut(PRIMARY_DATA_NAME)
    }

    pub fn attributes(&self) -> &DataAttributeList {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut DataAttributeList {
        &mut self.attributes
    }

    /// Typed factory getter: allocates a float array of `shape`, attaches
    /// `units`, registers it under `name` spanning `dim_indexes`.
    pub fn add_float_array(
        &mut self,
        name: impl Into<String>,
        units: impl Into<String>,
        dim_indexes: Vec<usize>,
        shape: Vec<usize>,
    ) -> Result<()> {
        let arr: ArrayData = crate::array::Array::<f32>::new(shape).into();
        self.add_array(DataArray::new(name, units, dim_indexes, arr))
    }

    pub fn add_double_array(
        &mut self,
        name: impl Into<String>,
        units: impl Into<String>,
        dim_indexes: Vec<usize>,
        shape: Vec<usize>,
    ) -> Result<()> {
        let arr: ArrayData = crate::array::Array::<f64>::new(shape).into();
        self.add_array(DataArray::new(name, units, dim_indexes, arr))
    }

    pub fn add_int_array(
        &mut self,
        name: impl Into<String>,
        units: impl Into<String>,
        dim_indexes: Vec<usize>,
        shape: Vec<usize>,
    ) -> Result<()> {
        let arr: ArrayData = crate::array::Array::<i32>::new(shape).into();
        self.add_array(DataArray::new(name, units, dim_indexes, arr))
    }

    pub fn get_float1d(&self, name: &str) -> Option<&crate::array::Array<f32>> {
        self.get_node(name).and_then(|a| a.data().as_f32())
    }

    pub fn get_float1d_mut(&mut self, name: &str) -> Option<&mut crate::array::Array<f32>> {
        self.get_node_mut(name).and_then(|a| a.data_mut().as_f32_mut())
    }

    /// Writes the canonical global attributes (spec §4.D / §6): `DataType`,
    /// `TypeName`, `Latitude`, `Longitude`, `Height`, `Time`,
    /// `FractionalTime`.
    pub fn update_global_attributes(&mut self, tag: &str) {
        self.data_type_tag = tag.to_string();
        self.attributes.put_string("DataType", tag);
        self.attributes.put_string("TypeName", self.type_name.clone());
        self.attributes.put_double("Latitude", self.location.latitude_deg);
        self.attributes.put_double("Longitude", self.location.longitude_deg);
        self.attributes.put_double("Height", self.location.height_km * 1000.0);
        self.attributes.put_long("Time", self.time.timestamp());
        self.attributes.put_double("FractionalTime", self.fractional_seconds);
    }

    /// Reverse of `update_global_attributes`; fails if a required
    /// attribute is missing or malformed.
    pub fn init_from_global_attributes(&mut self) -> Result<()> {
        let tag = self
            .attributes
            .get_string("DataType")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute DataType"))?;
        let type_name = self
            .attributes
            .get_string("TypeName")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute TypeName"))?;
        let lat = self
            .attributes
            .get_double("Latitude")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute Latitude"))?;
        let lon = self
            .attributes
            .get_double("Longitude")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute Longitude"))?;
        let height_m = self
            .attributes
            .get_double("Height")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute Height"))?;
        let epoch = self
            .attributes
            .get_long("Time")?
            .ok_or_else(|| RapioError::semantic("missing required global attribute Time"))?;
        let frac = self.attributes.get_double("FractionalTime")?.unwrap_or(0.0);

        self.data_type_tag = tag;
        self.type_name = type_name;
        self.location = Llh::new(lat, lon, height_m / 1000.0);
        self.time = Utc
            .timestamp_opt(epoch, 0)
            .single()
            .ok_or_else(|| RapioError::semantic("malformed Time global attribute"))?;
        self.fractional_seconds = frac;
        Ok(())
    }
}

impl SparseLifecycle for DataGrid {}

fn array_shape_matches(array: &DataArray, dims: &[DataGridDimension]) -> Option<bool> {
    let shape = array.data().shape();
    if shape.len() != array.dim_indexes().len() {
        return Some(false);
    }
    for (axis_shape, &dim_idx) in shape.iter().zip(array.dim_indexes()) {
        if *axis_shape != dims[dim_idx].size {
            return Some(false);
        }
    }
    Some(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_grid() -> DataGrid {
        let mut g = DataGrid::new("DataGrid", "Reflectivity", Llh::new(35.0, -97.0, 0.4), Utc::now());
        g.set_dims(vec![DataGridDimension::new("Lat", 3), DataGridDimension::new("Lon", 4)]).unwrap();
        g
    }

    #[test]
    fn duplicate_dimension_name_is_fatal() {
        let mut g = DataGrid::new("DataGrid", "X", Llh::new(0.0, 0.0, 0.0), Utc::now());
        let err = g.set_dims(vec![DataGridDimension::new("Lat", 1), DataGridDimension::new("Lat", 2)]);
        assert!(err.is_err());
    }

    #[test]
    fn array_with_unknown_dim_index_is_rejected() {
        let mut g = sample_grid();
        let bad = DataArray::new("primary", "dBZ", vec![5], crate::array::Array::<f32>::new([1]));
        assert!(g.add_array(bad).is_err());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let mut g = sample_grid();
        let bad = DataArray::new("primary", "dBZ", vec![0, 1], crate::array::Array::<f32>::new([99, 4]));
        assert!(g.add_array(bad).is_err());
    }

    #[test]
    fn add_array_replaces_same_name() {
        let mut g = sample_grid();
        g.add_float_array("primary", "dBZ", vec![0, 1], vec![3, 4]).unwrap();
        g.add_float_array("primary", "dBZ", vec![0, 1], vec![3, 4]).unwrap();
        assert_eq!(g.get_arrays().len(), 1);
    }

    #[test]
    fn global_attribute_round_trip() {
        let mut g = sample_grid();
        g.update_global_attributes("RadialSet");
        let mut g2 = DataGrid::new("DataGrid", "", Llh::new(0.0, 0.0, 0.0), Utc::now());
        g2.attributes = g.attributes().clone();
        g2.init_from_global_attributes().unwrap();
        assert_eq!(g2.data_type_tag(), "RadialSet");
        assert_eq!(g2.type_name(), "Reflectivity");
        assert!((g2.location().latitude_deg - 35.0).abs() < 1e-9);
    }

    #[test]
    fn init_from_global_attributes_fails_when_missing() {
        let mut g = DataGrid::new("DataGrid", "", Llh::new(0.0, 0.0, 0.0), Utc::now());
        assert!(g.init_from_global_attributes().is_err());
    }
}
