//! Text "dump" specializer (spec §4.I, §6): an ncdump-style rendering of
//! any DataGrid-backed DataType. Write-only, matching
//! `original_source/base/iotext/rIOText.cc` ("Reading text with IOTEXT
//! unsupported").
//!
//! Grounded in `rTextDataGrid.cc::write`: dimensions block, variables
//! block (each with its per-variable attributes), a global-attributes
//! block, then one `printArray` dump per array. The `console` key (spec
//! §6) routes output to stdout instead of the resolved `filename`.

use std::io::Write;

use crate::array::ElementType;
use crate::attribute::{AttributeValue, DataAttributeList};
use crate::constants::PRIMARY_DATA_NAME;
use crate::error::{RapioError, Result};
use crate::grid::{DataGrid, Keys};
use crate::io::DataTypeHandle;

fn element_type_name(t: ElementType) -> &'static str {
    match t {
        ElementType::Byte => "byte",
        ElementType::Int16 => "short",
        ElementType::Int32 => "int",
        ElementType::Float32 => "float",
        ElementType::Float64 => "double",
    }
}

fn dump_attributes(out: &mut impl Write, list: &DataAttributeList, header: &str) -> std::io::Result<()> {
    for (name, value) in list.iter() {
        write!(out, "\t\t{}:{} = ", header, name)?;
        match value {
            AttributeValue::Str(s) => write!(out, "\"{}\"", s)?,
            AttributeValue::Long(v) => write!(out, "{}", v)?,
            AttributeValue::Float(v) => write!(out, "{}", v)?,
            AttributeValue::Double(v) => write!(out, "{}", v)?,
        }
        writeln!(out, " ;")?;
    }
    Ok(())
}

/// Renders `grid` in the same shape `rTextDataGrid::write` produces: a
/// `netcdf {...}`-style block with dimensions, variables (primary array
/// renamed to the grid's `TypeName`, as on disk), global attributes, then
/// each array's flattened values via `Array::print_array`.
fn dump(out: &mut impl Write, grid: &DataGrid) -> std::io::Result<()> {
    writeln!(out, "RAPIO/MRMS DataGrid")?;
    writeln!(out, "netcdf {{")?;

    writeln!(out, "dimensions:")?;
    for dim in grid.dims() {
        writeln!(out, "\t{} = {} ;", dim.name, dim.size)?;
    }

    writeln!(out, "variables:")?;
    for array in grid.get_arrays() {
        let display_name = if array.name() == PRIMARY_DATA_NAME { grid.type_name() } else { array.name() };
        write!(out, "\t{} {}(", element_type_name(array.element_type()), display_name)?;
        let dims = array.dim_indexes();
        for (j, &idx) in dims.iter().enumerate() {
            if j > 0 {
                write!(out, ",")?;
            }
            write!(out, "{}", grid.dims()[idx].name)?;
        }
        writeln!(out, ") ;")?;
        dump_attributes(out, array.attributes(), display_name)?;
    }

    writeln!(out, "\n// global attributes:")?;
    dump_attributes(out, grid.attributes(), "")?;
    writeln!(out, "data:\n")?;

    for array in grid.get_arrays() {
        let display_name = if array.name() == PRIMARY_DATA_NAME { grid.type_name() } else { array.name() };
        writeln!(out, " {} = \n", display_name)?;
        array.data().print_array(out)?;
        writeln!(out, " ;")?;
    }

    writeln!(out, "}}")?;
    Ok(())
}

/// Writer entry point registered for `DataGrid`/`RadialSet`/`LatLonGrid`/
/// `LatLonHeightGrid` under `FormatKey::Text`. With the `console` key set
/// (any non-empty value), writes to stdout instead of the resolved
/// `filename`.
pub fn write_text(dt: &DataTypeHandle, keys: &Keys) -> Result<()> {
    let grid = dt.as_grid().ok_or_else(|| RapioError::semantic("text writer requires a DataGrid-backed DataType"))?;

    if keys.get("console").map(|v| !v.is_empty()).unwrap_or(false) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        dump(&mut handle, grid)?;
        return Ok(());
    }

    let path = keys.get("filename").ok_or_else(|| RapioError::semantic("missing 'filename' key"))?;
    let mut file = std::fs::File::create(path)?;
    dump(&mut file, grid)?;
    tracing::info!(target: "rapio::io", path, "text writer wrote DataGrid dump");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Llh;

    fn sample_grid() -> DataGrid {
        let mut g = DataGrid::new("DataGrid", "Reflectivity", Llh::new(35.0, -97.0, 0.4), chrono::Utc::now());
        g.set_dims(vec![crate::grid::DataGridDimension::new("Lat", 2), crate::grid::DataGridDimension::new("Lon", 2)])
            .unwrap();
        g.add_float_array(PRIMARY_DATA_NAME, "dBZ", vec![0, 1], vec![2, 2]).unwrap();
        g.update_global_attributes("DataGrid");
        g
    }

    #[test]
    fn dump_contains_dimensions_and_typename() {
        let g = sample_grid();
        let mut buf = Vec::new();
        dump(&mut buf, &g).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("dimensions:"));
        assert!(text.contains("Lat = 2 ;"));
        assert!(text.contains("Reflectivity"));
        assert!(text.contains("global attributes"));
    }

    #[test]
    fn write_requires_filename_without_console() {
        let g = sample_grid();
        let dt = DataTypeHandle::Grid(g);
        let keys = Keys::new();
        assert!(write_text(&dt, &keys).is_err());
    }
}
