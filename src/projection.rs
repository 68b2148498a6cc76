//! DataProjection façade: maps geographic coordinates to array indices
//! (spec §4.F).
//!
//! Grounded in `original_source/base/datatype/rLatLonGridProjection.cc`.
//! The cyclic include between DataGrid and DataProjection (spec §9) is
//! broken with `ProjectionSource`: DataGrid-backed types implement it,
//! `LatLonGridProjection` only depends on the trait, not on `DataGrid`
//! itself.

use crate::array::Array;
use crate::constants::DATA_UNAVAILABLE;
use crate::geospatial::latlon_grid::LatLonGrid;

/// A rectangular degree patch: top-left corner plus per-cell deltas.
/// `delta_lat` is negative (south-going) in every coverage query, matching
/// `spec.md`'s "ΔLat is negative" convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coverage {
    pub rows: usize,
    pub cols: usize,
    pub top_lat_deg: f64,
    pub left_lon_deg: f64,
    pub delta_lat_deg: f64,
    pub delta_lon_deg: f64,
}

/// The minimal shape+georeferencing a projection needs from its backing
/// grid, breaking the DataGrid <-> DataProjection cyclic include (spec §9).
pub trait ProjectionSource {
    fn nw_corner_deg(&self) -> (f64, f64);
    fn lat_spacing_deg(&self) -> f64;
    fn lon_spacing_deg(&self) -> f64;
    fn num_lats(&self) -> usize;
    fn num_lons(&self) -> usize;
    /// Borrowed view of the primary array's flat row-major storage.
    fn primary_values(&self) -> Option<&[f32]>;
}

impl ProjectionSource for LatLonGrid {
    fn nw_corner_deg(&self) -> (f64, f64) {
        let loc = self.location();
        (loc.latitude_deg, loc.longitude_deg)
    }

    fn lat_spacing_deg(&self) -> f64 {
        self.lat_spacing_deg() as f64
    }

    fn lon_spacing_deg(&self) -> f64 {
        self.lon_spacing_deg() as f64
    }

    fn num_lats(&self) -> usize {
        LatLonGrid::num_lats(self)
    }

    fn num_lons(&self) -> usize {
        LatLonGrid::num_lons(self)
    }

    fn primary_values(&self) -> Option<&[f32]> {
        self.primary().and_then(|p| p.data().as_f32()).map(Array::as_slice)
    }
}

/// `getValueAtLL` + the three coverage queries of spec §4.F, specialized to
/// an equirectangular LatLonGrid per the exact formulas in `SPEC_FULL.md`
/// §4.F.
///
/// The projection caches a borrowed reference to the grid's primary array
/// at construction (spec §9 "back pointers from projection to DataGrid" --
/// modeled as a borrow with a "discard on grid mutation" contract rather
/// than shared ownership, since the source grid may legitimately be
/// mutated and re-read by a caller that reacquires a fresh projection).
pub struct LatLonGridProjection<'g> {
    nw_lat: f64,
    nw_lon: f64,
    lat_spacing: f64,
    lon_spacing: f64,
    num_lats: usize,
    num_lons: usize,
    values: &'g [f32],
}

impl<'g> LatLonGridProjection<'g> {
    pub fn new(source: &'g impl ProjectionSource) -> Option<Self> {
        let (nw_lat, nw_lon) = source.nw_corner_deg();
        let values = source.primary_values()?;
        Some(LatLonGridProjection {
            nw_lat,
            nw_lon,
            lat_spacing: source.lat_spacing_deg(),
            lon_spacing: source.lon_spacing_deg(),
            num_lats: source.num_lats(),
            num_lons: source.num_lons(),
            values,
        })
    }

    /// Maps (lat, lon) degrees to a value, or `DataUnavailable` when the
    /// point falls off the grid (spec §4.F / §8).
    pub fn get_value_at_ll(&self, lat_deg: f64, lon_deg: f64) -> f64 {
        if self.num_lats == 0 || self.num_lons == 0 {
            return DATA_UNAVAILABLE;
        }
        let xd = (self.nw_lat - lat_deg) / self.lat_spacing;
        let x = xd.round();
        if x < 0.0 || x as usize >= self.num_lats {
            return DATA_UNAVAILABLE;
        }

        let mut lon = lon_deg;
        if lon < self.nw_lon {
            lon += 360.0;
        } else if lon > self.nw_lon + self.lon_spacing * self.num_lons as f64 {
            lon -= 360.0;
        }
        let yd = (lon - self.nw_lon) / self.lon_spacing;
        let y = yd.round();
        if y < 0.0 || y as usize >= self.num_lons {
            return DATA_UNAVAILABLE;
        }

        self.values[x as usize * self.num_lons + y as usize] as f64
    }

    /// A patch covering every cell exactly once (spec §4.F `CoverageFull`).
    pub fn coverage_full(&self) -> Coverage {
        Coverage {
            rows: self.num_lats,
            cols: self.num_lons,
            top_lat_deg: self.nw_lat,
            left_lon_deg: self.nw_lon,
            delta_lat_deg: -self.lat_spacing,
            delta_lon_deg: self.lon_spacing,
        }
    }

    /// A square degree patch centered on the grid's own center (spec §4.F
    /// `CoverageCenterDegree`).
    pub fn coverage_center_degree(&self, degree_out: f64, rows: usize, cols: usize) -> Coverage {
        let center_lat = self.nw_lat - self.lat_spacing * (self.num_lats as f64 * 0.5);
        let center_lon = self.nw_lon + self.lon_spacing * (self.num_lons as f64 * 0.5);
        let d_lat = (2.0 * degree_out) / rows as f64;
        let d_lon = (2.0 * degree_out) / cols as f64;
        Coverage {
            rows,
            cols,
            top_lat_deg: center_lat + degree_out,
            left_lon_deg: center_lon - degree_out,
            delta_lat_deg: -d_lat,
            delta_lon_deg: d_lon,
        }
    }

    /// Web-mercator-adjacent tile coverage (spec §4.F `CoverageTile`).
    /// `delta_lat == -delta_lon`, a deliberate square-pixel choice noted as
    /// an open question in spec §9 -- diverges from true mercator at high
    /// zoom, left uncorrected per the implementer's discretion.
    pub fn coverage_tile(&self, zoom: u32, rows: usize, cols: usize, center_lat_deg: f64, center_lon_deg: f64) -> Coverage {
        let deg_width = 360.0 / 2f64.powi(zoom as i32);
        let half = deg_width * 0.5;
        let left = center_lon_deg - half;
        let right = center_lon_deg + half;
        let d_lon = (right - left) / cols as f64;
        let d_lat = -d_lon;
        let top = center_lat_deg - d_lat * rows as f64 * 0.5;
        Coverage { rows, cols, top_lat_deg: top, left_lon_deg: left, delta_lat_deg: d_lat, delta_lon_deg: d_lon }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Llh;
    use chrono::Utc;

    fn sample() -> LatLonGrid {
        let mut g = LatLonGrid::create("Reflectivity", "dBZ", Llh::new(40.0, -100.0, 1.0), Utc::now(), 0.1, 0.1, 10, 10)
            .unwrap();
        g.get_float1d_mut(crate::constants::PRIMARY_DATA_NAME).unwrap().set(&[0, 0], 42.0);
        g
    }

    #[test]
    fn nw_corner_returns_cell_0_0() {
        let g = sample();
        let proj = LatLonGridProjection::new(&g).unwrap();
        assert_eq!(proj.get_value_at_ll(40.0, -100.0), 42.0);
    }

    #[test]
    fn strictly_outside_returns_data_unavailable() {
        let g = sample();
        let proj = LatLonGridProjection::new(&g).unwrap();
        assert_eq!(proj.get_value_at_ll(80.0, -100.0), DATA_UNAVAILABLE);
    }

    #[test]
    fn antimeridian_wrap_resolves_correct_cell() {
        let mut g = LatLonGrid::create("X", "dBZ", Llh::new(10.0, 170.0, 0.0), Utc::now(), 1.0, 10.0, 5, 3).unwrap();
        // Grid spans lon 170 .. 170+30=200 (i.e. wraps to -160). A query at
        // -178 should resolve to lon 182 after the +360 wrap, landing in
        // column 1.
        g.get_float1d_mut(crate::constants::PRIMARY_DATA_NAME).unwrap().set(&[0, 1], 7.0);
        let proj = LatLonGridProjection::new(&g).unwrap();
        assert_eq!(proj.get_value_at_ll(10.0, -178.0), 7.0);
    }

    #[test]
    fn coverage_full_has_negative_delta_lat() {
        let g = sample();
        let proj = LatLonGridProjection::new(&g).unwrap();
        let cov = proj.coverage_full();
        assert_eq!(cov.rows, 10);
        assert_eq!(cov.cols, 10);
        assert!(cov.delta_lat_deg < 0.0);
    }

    #[test]
    fn tile_coverage_has_square_pixels() {
        let g = sample();
        let proj = LatLonGridProjection::new(&g).unwrap();
        let cov = proj.coverage_tile(4, 256, 256, 40.0, -100.0);
        assert_eq!(cov.delta_lat_deg, -cov.delta_lon_deg);
    }
}
