//! Integration tests for the end-to-end scenarios in spec.md §8 that
//! exercise real I/O (netcdf crate round trips through the filesystem,
//! not just in-memory module logic). Scenarios 2 (ODIM) and 4 (GRIB2)
//! aren't reproduced here: building a valid synthetic HDF5/ODIM or
//! GRIB2 fixture by hand isn't something this crate's own writers can
//! help with (there's no ODIM/GRIB2 *writer*, only readers), and a
//! hand-assembled binary fixture can't be checked for validity without
//! running the toolchain. Those readers keep their worked-example
//! coverage as unit tests next to the code (`io::hdf5_odim`,
//! `io::grib2`).

use chrono::Utc;
use rapio_grid::geospatial::RadialSet;
use rapio_grid::grid::{Keys, Llh, SparseLifecycle};
use rapio_grid::io;

fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("rapio-e2e-{}-{}", std::process::id(), name))
}

/// spec.md §8 scenario 1: a 360x1000 RadialSet with three contiguous
/// MissingData-backed cells sparsifies to one run and restores bit-exact
/// on `post_write`.
#[test]
fn radial_sparse_round_trip() {
    let mut rs = RadialSet::create(
        "Reflectivity",
        "dBZ",
        Llh::new(35.0, -97.0, 0.4),
        Utc::now(),
        0.5,
        1000.0,
        250.0,
        360,
        1000,
    )
    .unwrap();

    {
        let primary = rs.get_float1d_mut(rapio_grid::constants::PRIMARY_DATA_NAME).unwrap();
        primary.fill(rapio_grid::constants::MISSING_DATA as f32);
        primary.set(&[45, 100], 35.5);
        primary.set(&[45, 101], 35.5);
        primary.set(&[45, 102], 35.5);
    }
    let original = rs.get_float1d(rapio_grid::constants::PRIMARY_DATA_NAME).unwrap().as_slice().to_vec();

    let mut keys = Keys::new();
    keys.insert("MakeSparse".to_string(), "on".to_string());
    rs.pre_write(&keys).unwrap();
    assert_eq!(rs.get_node("pixel_x").unwrap().data().as_i32().unwrap().len(), 1);
    rs.post_write(&keys).unwrap();

    let round_tripped = rs.get_float1d(rapio_grid::constants::PRIMARY_DATA_NAME).unwrap().as_slice().to_vec();
    assert_eq!(original, round_tripped);
}

/// spec.md §8 scenario 3: a NetCDF file with dims {X=5, Y=7} and one
/// float variable `Foo(X,Y)` and no `DataType` attribute reads into a
/// generic `DataGrid`. Without a `TypeName` matching `Foo`, the variable
/// keeps its own name rather than being renamed to "primary".
#[test]
fn generic_netcdf_passthrough_without_rename() {
    let path = scratch_path("passthrough.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("X", 5).unwrap();
        file.add_dimension("Y", 7).unwrap();
        let mut var = file.add_variable::<f32>("Foo", &["X", "Y"]).unwrap();
        var.put_values(&vec![1.0f32; 35], ..).unwrap();
    }

    let keys = Keys::new();
    let dt = io::read(path.to_str().unwrap(), &keys).unwrap().expect("read should succeed");
    assert_eq!(dt.data_type_tag(), "DataGrid");
    let grid = dt.as_grid().unwrap();
    assert!(grid.get_node("Foo").is_some(), "Foo should be preserved under its own name");
    assert!(grid.primary().is_none(), "no primary rename should occur without a matching TypeName");

    std::fs::remove_file(&path).ok();
}

/// Same file shape as above, but with a `TypeName` attribute equal to the
/// variable's on-disk name: the reader renames it to "primary" in memory
/// (spec.md §8 scenario 3's "iff TypeName matches" clause).
#[test]
fn generic_netcdf_passthrough_with_rename() {
    let path = scratch_path("passthrough-rename.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("X", 5).unwrap();
        file.add_dimension("Y", 7).unwrap();
        file.add_attribute("TypeName", "Foo").unwrap();
        let mut var = file.add_variable::<f32>("Foo", &["X", "Y"]).unwrap();
        var.put_values(&vec![2.0f32; 35], ..).unwrap();
    }

    let keys = Keys::new();
    let dt = io::read(path.to_str().unwrap(), &keys).unwrap().expect("read should succeed");
    let grid = dt.as_grid().unwrap();
    assert!(grid.get_node("Foo").is_none(), "Foo should have been renamed");
    assert!(grid.primary().is_some(), "renamed variable should be the primary array");

    std::fs::remove_file(&path).ok();
}

/// spec.md §8 scenario 6: unit conversion identities and a couple of
/// concrete conversions, exercised through the public `units` API end to
/// end (not just the internal table lookup).
#[test]
fn unit_conversion_scenarios() {
    assert_eq!(rapio_grid::units::convert("Kilometers", "Meters", 1.5), 1500.0);
    assert_eq!(rapio_grid::units::convert("Celsius", "Fahrenheit", 100.0), 212.0);
    assert_eq!(rapio_grid::units::convert("dBZ", "dimensionless", 42.0), 42.0);
}
