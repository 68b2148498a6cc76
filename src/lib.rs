//! Polymorphic gridded-data model and pluggable I/O dispatch for
//! radar/mosaic data: a typed `DataGrid` core, `RadialSet`/`LatLonGrid`/
//! `LatLonHeightGrid`/`BinaryTable` specializations built on top of it,
//! a dense/sparse run-length codec, and format specializers for NetCDF,
//! HDF5/ODIM, GRIB2, MRMS raw, and a text dump writer.

pub mod array;
pub mod attribute;
pub mod config;
pub mod constants;
pub mod data_array;
pub mod error;
pub mod geospatial;
pub mod grid;
pub mod io;
pub mod projection;
pub mod sparse;
pub mod units;

pub use error::{RapioError, Result};
pub use grid::{DataGrid, DataGridDimension, Keys, Llh, SparseLifecycle};
pub use io::DataTypeHandle;
