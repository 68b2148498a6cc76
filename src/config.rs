//! Process-wide configuration (spec §6 ambient "Keys map" + §9 "no mutation
//! after init" global registries).
//!
//! Grounded in the teacher's `clap`-based `RadyOptions` (`legacy_silv_lib.rs`
//! before trimming), generalized from a CLI-only options struct into a
//! config layer the library itself consumes. The CLI binary (`rapio-cli`)
//! is the only thing that builds a `RapioConfig` from `clap` args; the
//! library never reaches for global config beyond the registries.

use std::str::FromStr;

/// How a writer resolves its destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilePathMode {
    /// Generate a path from the DataType's conventions (directory layout,
    /// naming scheme).
    Generated,
    /// Bypass generated paths; write to exactly the caller-given filename
    /// (spec §6 `filepathmode=direct`).
    Direct,
}

/// Process-wide knobs read by format specializers (spec §6 Keys map, §5
/// "static compression-level and GZIP tuning knobs... set before I/O
/// begins").
#[derive(Debug, Clone)]
pub struct RapioConfig {
    /// NetCDF deflate level, 0-9 (spec §6 `deflate_level`, default 6).
    pub deflate_level: u8,
    /// Drives the sparse codec's `preWrite` step (spec §6 `MakeSparse`).
    pub make_sparse: bool,
    /// NetCDF creation flags; `true` requests netCDF-4, `false` classic
    /// netCDF-3 (spec §6 `ncflags`, default netCDF-4).
    pub netcdf4: bool,
    pub filepath_mode: FilePathMode,
    /// Text specializer writes to stdout instead of a file (spec §6
    /// `console`).
    pub console: bool,
    pub log_level: tracing::Level,
}

impl Default for RapioConfig {
    fn default() -> Self {
        RapioConfig {
            deflate_level: 6,
            make_sparse: false,
            netcdf4: true,
            filepath_mode: FilePathMode::Generated,
            console: false,
            log_level: tracing::Level::INFO,
        }
    }
}

impl RapioConfig {
    pub fn with_deflate_level(mut self, level: u8) -> Self {
        self.deflate_level = level.min(9);
        self
    }

    pub fn with_make_sparse(mut self, on: bool) -> Self {
        self.make_sparse = on;
        self
    }
}

/// Installs a `tracing-subscriber` fmt subscriber at `level`. Grounded in
/// `bmflynn-rdr`'s pairing of `tracing` + `tracing-subscriber`; idempotent,
/// safe to call more than once (later calls are no-ops), matching the
/// "initialize once" discipline spec §5/§9 require of process-wide state.
pub fn init_logging(level: tracing::Level) {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string()));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Parses a `RAPIO_LOG` style level string, falling back to `info` on a bad
/// value rather than failing startup.
pub fn parse_log_level(s: &str) -> tracing::Level {
    tracing::Level::from_str(s).unwrap_or(tracing::Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_deflate_is_six() {
        assert_eq!(RapioConfig::default().deflate_level, 6);
    }

    #[test]
    fn deflate_level_is_clamped() {
        assert_eq!(RapioConfig::default().with_deflate_level(20).deflate_level, 9);
    }

    #[test]
    fn bad_log_level_falls_back_to_info() {
        assert_eq!(parse_log_level("not-a-level"), tracing::Level::INFO);
    }
}
