//! Startup configuration.
//!
//! Every value is fixed once the simulation starts. Natively the defaults can be
//! overridden from the environment; the web build always uses the defaults.

use std::{path::PathBuf, str::FromStr, time::Duration};

use log::LevelFilter;

use crate::{error::ConfigError, sim::SeedPattern};

pub const GRID_SIZE_VAR: &str = "GRIDLIFE_GRID_SIZE";
pub const WORK_GROUP_SIZE_VAR: &str = "GRIDLIFE_WORK_GROUP_SIZE";
pub const FRAME_INTERVAL_VAR: &str = "GRIDLIFE_FRAME_INTERVAL";
pub const SEED_VAR: &str = "GRIDLIFE_SEED";
pub const PATTERN_VAR: &str = "GRIDLIFE_PATTERN";
pub const SHADER_DIR_VAR: &str = "GRIDLIFE_SHADER_DIR";
pub const LOG_VAR: &str = "GRIDLIFE_LOG";

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Side length of the square grid, in cells
    pub grid_size: u32,
    /// Side length of one compute work group
    pub work_group_size: u32,
    /// Minimum wall-clock time between two simulation steps
    pub max_frame_duration: Duration,
    /// Fixed seed for the initial pattern. `None` seeds from entropy.
    pub seed: Option<u64>,
    pub pattern: SeedPattern,
    /// Load WGSL from this directory instead of the embedded sources
    pub shader_dir: Option<PathBuf>,
    pub log_level: LevelFilter,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_size: 32,
            work_group_size: 8,
            max_frame_duration: Duration::from_millis(100),
            seed: None,
            pattern: SeedPattern::random(),
            shader_dir: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl SimulationConfig {
    /// Read overrides from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, falling back to the defaults
    /// for every key the lookup does not know.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(GRID_SIZE_VAR) {
            config.grid_size = parse_var(GRID_SIZE_VAR, &value)?;
        }
        if let Some(value) = lookup(WORK_GROUP_SIZE_VAR) {
            config.work_group_size = parse_var(WORK_GROUP_SIZE_VAR, &value)?;
        }
        if let Some(value) = lookup(FRAME_INTERVAL_VAR) {
            config.max_frame_duration =
                humantime::parse_duration(value.trim()).map_err(|e| ConfigError::Parse {
                    name: FRAME_INTERVAL_VAR,
                    value: value.clone(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(value) = lookup(SEED_VAR) {
            config.seed = Some(parse_var(SEED_VAR, &value)?);
        }
        if let Some(value) = lookup(PATTERN_VAR) {
            config.pattern = parse_var(PATTERN_VAR, &value)?;
        }
        if let Some(value) = lookup(SHADER_DIR_VAR) {
            config.shader_dir = Some(PathBuf::from(value));
        }
        if let Some(value) = lookup(LOG_VAR) {
            config.log_level = parse_var(LOG_VAR, &value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_size == 0 {
            return Err(ConfigError::NotPositive {
                name: GRID_SIZE_VAR,
                value: self.grid_size,
            });
        }
        if self.work_group_size == 0 {
            return Err(ConfigError::NotPositive {
                name: WORK_GROUP_SIZE_VAR,
                value: self.work_group_size,
            });
        }
        Ok(())
    }
}

fn parse_var<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        name,
        value: value.to_owned(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = SimulationConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.grid_size, 32);
        assert_eq!(config.work_group_size, 8);
        assert_eq!(config.max_frame_duration, Duration::from_millis(100));
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = SimulationConfig::from_lookup(lookup_from(&[
            (GRID_SIZE_VAR, "30"),
            (WORK_GROUP_SIZE_VAR, " 4 "),
            (FRAME_INTERVAL_VAR, "250ms"),
            (SEED_VAR, "7"),
            (PATTERN_VAR, "glider"),
            (SHADER_DIR_VAR, "assets/shaders"),
            (LOG_VAR, "debug"),
        ]))
        .unwrap();
        assert_eq!(config.grid_size, 30);
        assert_eq!(config.work_group_size, 4);
        assert_eq!(config.max_frame_duration, Duration::from_millis(250));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.pattern, SeedPattern::Glider);
        assert_eq!(config.shader_dir, Some(PathBuf::from("assets/shaders")));
        assert_eq!(config.log_level, LevelFilter::Debug);
    }

    #[test]
    fn test_zero_frame_interval_is_allowed() {
        let config =
            SimulationConfig::from_lookup(lookup_from(&[(FRAME_INTERVAL_VAR, "0s")])).unwrap();
        assert_eq!(config.max_frame_duration, Duration::ZERO);
    }

    #[test]
    fn test_zero_sizes_are_rejected() {
        let err = SimulationConfig::from_lookup(lookup_from(&[(GRID_SIZE_VAR, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotPositive {
                name: GRID_SIZE_VAR,
                value: 0
            }
        );
        let err = SimulationConfig::from_lookup(lookup_from(&[(WORK_GROUP_SIZE_VAR, "0")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NotPositive {
                name: WORK_GROUP_SIZE_VAR,
                ..
            }
        ));
    }

    #[test]
    fn test_garbage_values_are_reported() {
        let err = SimulationConfig::from_lookup(lookup_from(&[(GRID_SIZE_VAR, "-3")])).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { name: GRID_SIZE_VAR, .. }));
        let err = SimulationConfig::from_lookup(lookup_from(&[(FRAME_INTERVAL_VAR, "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Parse {
                name: FRAME_INTERVAL_VAR,
                ..
            }
        ));
        let err = SimulationConfig::from_lookup(lookup_from(&[(PATTERN_VAR, "spiral")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { name: PATTERN_VAR, .. }));
    }
}
