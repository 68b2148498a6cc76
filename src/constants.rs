//! Sentinel values and the generic tolerance used to compare against them.
//!
//! Grounded in `original_source/base/rConstants.h` / `rConstants.cc`
//! (`SentinelDouble` with a per-sentinel tolerance, collapsed here to the
//! single ±1e-5 tolerance spec.md mandates).

/// Marks a cell with no observation.
pub const MISSING_DATA: f64 = -99900.0;
/// Marks a cell affected by velocity range folding.
pub const RANGE_FOLDED: f64 = -99901.0;
/// Marks a cell outside the sensor's coverage (e.g. off the projected grid).
pub const DATA_UNAVAILABLE: f64 = -99903.0;

/// Absolute tolerance used for all sentinel comparisons.
pub const SENTINEL_TOLERANCE: f64 = 1e-5;

/// Canonical on-disk/in-memory name of a DataGrid's primary array.
pub const PRIMARY_DATA_NAME: &str = "primary";

/// Attribute name marking a DataArray as excluded from generic writers.
pub const RAPIO_HIDDEN: &str = "RAPIO_HIDDEN";

fn near(a: f64, b: f64) -> bool {
    (a - b).abs() <= SENTINEL_TOLERANCE
}

/// True iff `v` is not one of the three sentinels (within tolerance).
pub fn is_good(v: f64) -> bool {
    // Fast path: sentinels are all <= -99900, so anything larger clears them all.
    if v > -99899.0 {
        return true;
    }
    !(near(v, MISSING_DATA) || near(v, RANGE_FOLDED) || near(v, DATA_UNAVAILABLE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_good_rejects_all_sentinels() {
        assert!(!is_good(MISSING_DATA));
        assert!(!is_good(RANGE_FOLDED));
        assert!(!is_good(DATA_UNAVAILABLE));
        assert!(!is_good(MISSING_DATA + 0.000001));
    }

    #[test]
    fn is_good_accepts_real_values() {
        assert!(is_good(0.0));
        assert!(is_good(35.5));
        assert!(is_good(-99899.0));
    }
}
