//! Generic NetCDF <-> DataGrid reader/writer (spec §4.I).
//!
//! Grounded in `original_source/base/ionetcdf/rNetcdfDataGrid.cc` for the
//! dimension/variable walk and the `netcdf` crate's actual method surface
//! as used in `JoegottabeGitenme-JoeGCServices/crates/netcdf-parser/src/native.rs`
//! (`netcdf::open`, `.dimension().len()`, `.variable()`, `.get_values(..)`,
//! `.attribute_value()`).

use netcdf::AttrValue;

use crate::array::{Array, ArrayData};
use crate::attribute::{AttributeValue, DataAttributeList};
use crate::constants::PRIMARY_DATA_NAME;
use crate::data_array::DataArray;
use crate::error::{RapioError, Result};
use crate::geospatial::{BinaryTable, Column, ColumnData, TableInfo};
use crate::grid::{DataGrid, DataGridDimension, Keys};
use crate::io::DataTypeHandle;

/// Reads just the `DataType` global attribute (spec §4.H step 4), without
/// materializing the whole grid -- used by the dispatcher to pick a
/// specializer before committing to a full read.
pub fn probe_data_type_tag(path: &str) -> Result<Option<String>> {
    let file = netcdf::open(path)?;
    Ok(global_string_attr(&file, "DataType"))
}

fn global_string_attr(file: &netcdf::File, name: &str) -> Option<String> {
    let attr = file.attribute(name)?;
    match attr.value().ok()? {
        AttrValue::Str(s) => Some(s),
        _ => None,
    }
}

fn attr_value_to_typed(value: AttrValue) -> Option<AttributeValue> {
    match value {
        AttrValue::Str(s) => Some(AttributeValue::Str(s)),
        AttrValue::Float(f) => Some(AttributeValue::Float(f)),
        AttrValue::Double(d) => Some(AttributeValue::Double(d)),
        AttrValue::Short(v) => Some(AttributeValue::Long(v as i64)),
        AttrValue::Int(v) => Some(AttributeValue::Long(v as i64)),
        AttrValue::Long(v) => Some(AttributeValue::Long(v)),
        _ => None,
    }
}

fn read_variable_attributes(var: &netcdf::Variable) -> DataAttributeList {
    let mut attrs = DataAttributeList::new();
    for attr in var.attributes() {
        if let Ok(value) = attr.value() {
            if let Some(typed) = attr_value_to_typed(value) {
                attrs.put(attr.name().to_string(), typed);
            }
        }
    }
    attrs
}

/// Reader-side acceptance of both the MRMS-canonical `Units` and the
/// legacy lowercase `units` attribute (spec §6).
fn variable_units(var: &netcdf::Variable) -> String {
    for name in ["Units", "units"] {
        if let Some(Ok(AttrValue::Str(s))) = var.attribute_value(name) {
            return s;
        }
    }
    String::new()
}

/// Picks the Rust element type to request from `get_values` by the
/// variable's name rather than probing the NetCDF library's own type tag:
/// the sparse pixel-index columns are always int32, everything else RAPIO
/// writes is float32 (spec §4.A/§6), so the name alone disambiguates
/// without depending on a library type enum the corpus never exercises.
fn read_array_data(var: &netcdf::Variable, shape: Vec<usize>) -> Result<ArrayData> {
    match var.name().as_ref() {
        "pixel_x" | "pixel_y" | "pixel_z" | "pixel_count" => {
            let flat: Vec<i32> = var.get_values(..)?;
            Ok(Array::from_flat(shape, flat).into())
        }
        _ => {
            let flat: Vec<f32> = var.get_values(..)?;
            Ok(Array::from_flat(shape, flat).into())
        }
    }
}

/// Walks every dimension and every variable in `file`, building a generic
/// `DataGrid`. Recognizes the legacy sparse encoding (`pixel` dimension +
/// `pixel_x`/`pixel_y`[/`pixel_z`]/`pixel_count` variables) by leaving
/// those arrays in place under their on-disk names -- `post_read`
/// (`SparseLifecycle`) is what actually unsparses them, once the caller
/// knows which geospatial shape to target.
pub fn read_generic(keys: &Keys) -> Result<DataTypeHandle> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let file = netcdf::open(path)?;

    let mut grid = DataGrid::new("DataGrid", "", crate::grid::Llh::new(0.0, 0.0, 0.0), chrono::Utc::now());
    for attr in file.attributes() {
        if let Ok(value) = attr.value() {
            if let Some(typed) = attr_value_to_typed(value) {
                grid.attributes_mut().put(attr.name().to_string(), typed);
            }
        }
    }
    // A `DataType` global attribute is the discriminator the dispatcher
    // uses to route to a specializer (spec §4.H step 4); when it's absent
    // the file is still a readable NetCDF passthrough (spec §8 scenario 3),
    // just tagged generically rather than semantically rejected.
    if grid.init_from_global_attributes().is_err() {
        let type_name = grid.attributes().get_string("TypeName").ok().flatten().unwrap_or_default();
        grid.set_data_type_tag("DataGrid");
        grid.set_type_name(type_name);
    }
    let type_name = grid.type_name().to_string();

    let dims: Vec<DataGridDimension> =
        file.dimensions().map(|d| DataGridDimension::new(d.name(), d.len())).collect();
    let dim_index_of: std::collections::HashMap<String, usize> =
        dims.iter().enumerate().map(|(i, d)| (d.name.clone(), i)).collect();
    grid.set_dims(dims)?;

    for var in file.variables() {
        let var_dims: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let dim_indexes: Vec<usize> = var
            .dimensions()
            .iter()
            .map(|d| *dim_index_of.get(d.name().as_ref()).expect("variable dimension not in dimension table"))
            .collect();
        let mut name = var.name().to_string();
        if name == type_name && !type_name.is_empty() {
            name = PRIMARY_DATA_NAME.to_string();
        }
        let units = variable_units(&var);
        let data = read_array_data(&var, var_dims)?;
        let mut array = DataArray::new(name, units, dim_indexes, data);
        for (k, v) in read_variable_attributes(&var).iter() {
            array.attributes_mut().put(k.clone(), v.clone());
        }
        grid.add_array(array)?;
    }

    Ok(DataTypeHandle::Grid(grid))
}

/// Declares dims and every variable (with its attributes) before any data
/// write, matching netCDF-3's "declare before write" discipline that
/// `spec.md` §5 requires the core preserve even under netCDF-4.
pub fn write_generic_to(grid: &DataGrid, path: &str, deflate_level: u8) -> Result<()> {
    let mut file = netcdf::create(path)?;

    for dim in grid.dims() {
        file.add_dimension(&dim.name, dim.size)?;
    }

    file.add_attribute("DataType", grid.data_type_tag())?;
    file.add_attribute("TypeName", grid.type_name())?;
    file.add_attribute("Latitude", grid.location().latitude_deg)?;
    file.add_attribute("Longitude", grid.location().longitude_deg)?;
    file.add_attribute("Height", grid.location().height_km * 1000.0)?;
    file.add_attribute("Time", grid.time().timestamp())?;
    file.add_attribute("FractionalTime", grid.fractional_seconds())?;
    file.add_attribute("MissingData", crate::constants::MISSING_DATA as f32)?;
    file.add_attribute("RangeFolded", crate::constants::RANGE_FOLDED as f32)?;
    file.add_attribute("MRMSWriterInfo", "rapio-grid")?;

    let dim_names: Vec<String> = grid.dims().iter().map(|d| d.name.clone()).collect();

    for array in grid.get_arrays() {
        if array.is_hidden() {
            continue;
        }
        let on_disk_name = if array.name() == PRIMARY_DATA_NAME { grid.type_name() } else { array.name() };
        let names: Vec<&str> = array.dim_indexes().iter().map(|&i| dim_names[i].as_str()).collect();

        match array.data() {
            ArrayData::Float32(a) => {
                let mut var = file.add_variable::<f32>(on_disk_name, &names)?;
                if deflate_level > 0 {
                    var.deflate(deflate_level as i32, true)?;
                }
                var.put_attribute("Units", array.units())?;
                var.put_values(a.as_slice(), ..)?;
            }
            ArrayData::Float64(a) => {
                let mut var = file.add_variable::<f64>(on_disk_name, &names)?;
                if deflate_level > 0 {
                    var.deflate(deflate_level as i32, true)?;
                }
                var.put_attribute("Units", array.units())?;
                var.put_values(a.as_slice(), ..)?;
            }
            ArrayData::Int32(a) => {
                let mut var = file.add_variable::<i32>(on_disk_name, &names)?;
                if deflate_level > 0 {
                    var.deflate(deflate_level as i32, true)?;
                }
                var.put_attribute("Units", array.units())?;
                var.put_values(a.as_slice(), ..)?;
            }
            ArrayData::Int16(a) => {
                let mut var = file.add_variable::<i16>(on_disk_name, &names)?;
                var.put_attribute("Units", array.units())?;
                var.put_values(a.as_slice(), ..)?;
            }
            ArrayData::Byte(a) => {
                let mut var = file.add_variable::<u8>(on_disk_name, &names)?;
                var.put_attribute("Units", array.units())?;
                var.put_values(a.as_slice(), ..)?;
            }
        }
    }

    for (name, value) in grid.attributes().iter() {
        match value {
            AttributeValue::Str(s) => file.add_attribute(name, s.as_str())?,
            AttributeValue::Long(v) => file.add_attribute(name, *v)?,
            AttributeValue::Float(v) => file.add_attribute(name, *v)?,
            AttributeValue::Double(v) => file.add_attribute(name, *v)?,
        };
    }

    Ok(())
}

pub fn write_generic(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let deflate = keys.get("deflate_level").and_then(|s| s.parse().ok()).unwrap_or(6);
    let grid = dt.as_grid().ok_or_else(|| RapioError::semantic("generic NetCDF writer requires a DataGrid"))?;
    write_generic_to(grid, path, deflate)
}

/// Reads a `BinaryTable` back from a NetCDF file written by
/// `write_binary_table` (spec §4.E `BinaryTable` persisted generically
/// through NetCDF, grounded in `rNetcdfBinaryTable.cc`): one dimension per
/// table sized to its row count, one variable per column.
pub fn read_binary_table(keys: &Keys) -> Result<DataTypeHandle> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let file = netcdf::open(path)?;

    let mut bt = BinaryTable::new();
    for dim in file.dimensions() {
        let table_name = dim.name().to_string();
        let row_count = dim.len();
        let mut table = TableInfo::new(&table_name, row_count);
        for var in file.variables() {
            let owns_dim = var.dimensions().iter().any(|d| d.name().as_ref() == table_name);
            if !owns_dim || var.dimensions().len() != 1 {
                continue;
            }
            let units = variable_units(&var);
            let column_type = match var.attribute_value("ColumnType") {
                Some(Ok(AttrValue::Str(s))) => s,
                _ => "float".to_string(),
            };
            let data = match column_type.as_str() {
                "ushort" => {
                    let raw: Vec<i16> = var.get_values(..)?;
                    ColumnData::UShort(raw.into_iter().map(|v| v as u16).collect())
                }
                "uchar" => {
                    let raw: Vec<u8> = var.get_values(..)?;
                    ColumnData::UChar(raw)
                }
                _ => ColumnData::Float(var.get_values(..)?),
            };
            table.add_column(var.name().to_string(), units, data);
        }
        if !table.columns.is_empty() {
            bt.add_table(table);
        }
    }

    Ok(DataTypeHandle::BinaryTable(bt))
}

pub fn write_binary_table(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let bt = match dt {
        DataTypeHandle::BinaryTable(bt) => bt,
        _ => return Err(RapioError::semantic("binary table writer requires a BinaryTable")),
    };
    let mut file = netcdf::create(path)?;
    for table in &bt.tables {
        file.add_dimension(&table.table_name, table.row_count)?;
        for column in &table.columns {
            write_column(&mut file, &table.table_name, column)?;
        }
    }
    Ok(())
}

fn write_column(file: &mut netcdf::FileMut, dim_name: &str, column: &Column) -> Result<()> {
    match &column.data {
        ColumnData::Float(v) => {
            let mut var = file.add_variable::<f32>(&column.name, &[dim_name])?;
            var.put_attribute("Units", column.units.as_str())?;
            var.put_attribute("ColumnType", "float")?;
            var.put_values(v, ..)?;
        }
        ColumnData::UShort(v) => {
            let as_i16: Vec<i16> = v.iter().map(|&x| x as i16).collect();
            let mut var = file.add_variable::<i16>(&column.name, &[dim_name])?;
            var.put_attribute("Units", column.units.as_str())?;
            var.put_attribute("ColumnType", "ushort")?;
            var.put_values(&as_i16, ..)?;
        }
        ColumnData::UChar(v) => {
            let mut var = file.add_variable::<u8>(&column.name, &[dim_name])?;
            var.put_attribute("Units", column.units.as_str())?;
            var.put_attribute("ColumnType", "uchar")?;
            var.put_values(v, ..)?;
        }
        ColumnData::Str(v) => {
            // NetCDF-3/4 classic has no native variable-length string array;
            // store as a newline-joined blob attribute instead (grounded in
            // `rNetcdfBinaryTable.cc`'s fallback for Str columns).
            let joined = v.join("\n");
            file.add_attribute(&format!("{dim_name}.{}", column.name), joined.as_str())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primary_rename_roundtrips_through_type_name() {
        // Pure-logic check of the rename rule without touching the
        // filesystem/netcdf library: on-disk name is TypeName, in-memory
        // name is always "primary".
        let type_name = "Reflectivity";
        let on_disk = if PRIMARY_DATA_NAME == "primary" { type_name } else { PRIMARY_DATA_NAME };
        assert_eq!(on_disk, "Reflectivity");
    }
}
