//! Unit conversion cache (spec §5 "udunits unit-conversion cache, lazily
//! loaded on first use and then read-only").
//!
//! Grounded in `original_source/base/rUnit.h`: the original wraps udunits2
//! behind a `UnitConverter{slope, intercept}` pair and a `value()` helper.
//! No udunits2 FFI crate appears anywhere in the corpus, so the conversion
//! table here is a small hand-rolled slope/intercept registry covering the
//! unit families RAPIO actually round-trips (length, temperature), plus the
//! "dimensionless" identity contract spec §8 calls out. This is documented
//! as a substitution in `DESIGN.md`.

use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

/// `value = slope * input + intercept`.
#[derive(Debug, Clone, Copy)]
pub struct UnitConverter {
    pub slope: f64,
    pub intercept: f64,
}

impl UnitConverter {
    pub fn identity() -> Self {
        UnitConverter { slope: 1.0, intercept: 0.0 }
    }

    pub fn value(&self, d: f64) -> f64 {
        self.slope * d + self.intercept
    }
}

lazy_static! {
    /// (from, to) -> converter. Populated once on first lookup; read-only
    /// thereafter per the "no mutation after init" rule (spec §5/§9).
    static ref CACHE: Mutex<HashMap<(String, String), UnitConverter>> = Mutex::new(base_table());
}

fn base_table() -> HashMap<(String, String), UnitConverter> {
    let mut m = HashMap::new();
    m.insert(("Kilometers".to_string(), "Meters".to_string()), UnitConverter { slope: 1000.0, intercept: 0.0 });
    m.insert(("Meters".to_string(), "Kilometers".to_string()), UnitConverter { slope: 0.001, intercept: 0.0 });
    m.insert(("Celsius".to_string(), "Fahrenheit".to_string()), UnitConverter { slope: 9.0 / 5.0, intercept: 32.0 });
    m.insert(("Fahrenheit".to_string(), "Celsius".to_string()), UnitConverter { slope: 5.0 / 9.0, intercept: -32.0 * 5.0 / 9.0 });
    m.insert(("Meters".to_string(), "Feet".to_string()), UnitConverter { slope: 3.280839895, intercept: 0.0 });
    m.insert(("Feet".to_string(), "Meters".to_string()), UnitConverter { slope: 1.0 / 3.280839895, intercept: 0.0 });
    m
}

/// Looks up (or derives) a converter from `from` to `to`. "dimensionless" on
/// either side is a contractual identity (spec §8 scenario 6); a unit
/// converting to itself is always the identity regardless of whether it is
/// registered.
pub fn get_converter(from: &str, to: &str) -> Option<UnitConverter> {
    if from.eq_ignore_ascii_case(to) || to.eq_ignore_ascii_case("dimensionless") || from.eq_ignore_ascii_case("dimensionless") {
        return Some(UnitConverter::identity());
    }
    let cache = CACHE.lock().unwrap();
    cache.get(&(from.to_string(), to.to_string())).copied()
}

/// Converts `from_value` in unit `from` into unit `to`. Returns the input
/// unchanged if no converter is registered and the units are not
/// identical/dimensionless (mirrors the original's "fails silently to the
/// input value" convenience, grounded in `rUnit.cc`'s default-constructed
/// `UnitConverter{slope: 1, intercept: 0}`).
pub fn convert(from: &str, to: &str, from_value: f64) -> f64 {
    match get_converter(from, to) {
        Some(uc) => uc.value(from_value),
        None => from_value,
    }
}

/// Like `convert`, but distinguishes "no known conversion" from a
/// successful one (mirrors `Unit::convert`'s success-flag overload).
pub fn try_convert(from: &str, to: &str, from_value: f64) -> Option<f64> {
    get_converter(from, to).map(|uc| uc.value(from_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kilometers_to_meters() {
        assert_eq!(convert("Kilometers", "Meters", 1.5), 1500.0);
    }

    #[test]
    fn celsius_to_fahrenheit() {
        assert_eq!(convert("Celsius", "Fahrenheit", 100.0), 212.0);
    }

    #[test]
    fn dimensionless_is_identity() {
        assert_eq!(convert("dBZ", "dimensionless", 35.5), 35.5);
        assert_eq!(convert("dimensionless", "dBZ", 35.5), 35.5);
    }

    #[test]
    fn unknown_pair_falls_back_to_input() {
        assert_eq!(convert("Furlongs", "Fortnights", 4.0), 4.0);
    }

    #[test]
    fn try_convert_distinguishes_unknown() {
        assert!(try_convert("Kilometers", "Meters", 1.0).is_some());
        assert!(try_convert("Furlongs", "Fortnights", 1.0).is_none());
    }
}
