use std::env;

use serde::Serialize;

use crate::cluster::ClusterConfig;

const DEFAULT_PLAYOFF_SEEDS: usize = 5;

/// Tunables for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PipelineConfig {
    pub cluster: ClusterConfig,
    pub playoff_seeds: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            playoff_seeds: DEFAULT_PLAYOFF_SEEDS,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source.
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = ClusterConfig::default();
        let usize_var = |key: &str, default: usize| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(default)
        };
        let seed = lookup("FFDASH_CLUSTER_SEED")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(defaults.seed);

        Self {
            cluster: ClusterConfig {
                k: usize_var("FFDASH_CLUSTER_K", defaults.k).clamp(1, 12),
                restarts: usize_var("FFDASH_CLUSTER_RESTARTS", defaults.restarts).clamp(1, 100),
                seed,
                max_iter: usize_var("FFDASH_CLUSTER_MAX_ITER", defaults.max_iter).clamp(1, 10_000),
            },
            playoff_seeds: usize_var("FFDASH_PLAYOFF_SEEDS", DEFAULT_PLAYOFF_SEEDS).clamp(4, 5),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(PipelineConfig::from_lookup(|_| None), PipelineConfig::default());
    }

    #[test]
    fn values_are_parsed_and_clamped() {
        let vars: HashMap<&str, &str> = [
            ("FFDASH_CLUSTER_K", " 4 "),
            ("FFDASH_CLUSTER_RESTARTS", "0"),
            ("FFDASH_CLUSTER_SEED", "7"),
            ("FFDASH_CLUSTER_MAX_ITER", "lots"),
            ("FFDASH_PLAYOFF_SEEDS", "8"),
        ]
        .into_iter()
        .collect();
        let config = PipelineConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.cluster.k, 4);
        assert_eq!(config.cluster.restarts, 1);
        assert_eq!(config.cluster.seed, 7);
        assert_eq!(config.cluster.max_iter, 300);
        assert_eq!(config.playoff_seeds, 5);
    }
}
