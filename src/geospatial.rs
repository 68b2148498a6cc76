//! Geospatial specializations of `DataGrid` (spec §4.E): `RadialSet`,
//! `LatLonGrid`, `LatLonHeightGrid`, and the tabular `BinaryTable`.

pub mod binary_table;
pub mod latlon_grid;
pub mod latlon_height_grid;
pub mod radial_set;

pub use binary_table::{BinaryTable, Column, ColumnData, ColumnType, TableInfo};
pub use latlon_grid::LatLonGrid;
pub use latlon_height_grid::LatLonHeightGrid;
pub use radial_set::RadialSet;
