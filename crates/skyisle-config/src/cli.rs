//! Command-line overrides for the generator configuration.

use std::path::PathBuf;

use clap::Args;

use crate::Config;

/// Settings that may be overridden from the command line.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Args, Debug, Clone, Default)]
pub struct CliArgs {
    /// World seed.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// System edge length in chunks.
    #[arg(long, global = true)]
    pub system_size: Option<i32>,

    /// Catalog file to load instead of the built-in one.
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Number of generation worker threads.
    #[arg(long, global = true)]
    pub threads: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(seed) = args.seed {
            self.world.seed = seed;
        }
        if let Some(size) = args.system_size {
            self.world.system_size_chunks = size;
        }
        if let Some(ref path) = args.catalog {
            self.generation.catalog_path = Some(path.clone());
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            seed: Some(99),
            catalog: Some(PathBuf::from("my_catalog.ron")),
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.world.seed, 99);
        assert_eq!(
            config.generation.catalog_path,
            Some(PathBuf::from("my_catalog.ron"))
        );
        // Non-overridden fields retain defaults
        assert_eq!(config.world.system_size_chunks, 50);
        assert_eq!(config.debug.log_level, "info");
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }
}
