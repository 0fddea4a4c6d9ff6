//! Runtime configuration.

use std::str::FromStr;

use tracing::warn;

pub const DEFAULT_MAX_DEPTH: usize = 1000;
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Runtime configuration options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Logical call-chain bound per execution. Not a native stack guard.
    pub max_depth: usize,
    pub cache_capacity: usize,
    pub cache_enabled: bool,
    pub metrics_enabled: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_enabled: true,
            metrics_enabled: true,
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity.max(1);
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.metrics_enabled = enabled;
        self
    }

    /// Defaults overridden by `STRAND_MAX_DEPTH`, `STRAND_CACHE_CAPACITY`
    /// and `STRAND_CACHE`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(v) = parse_var::<usize>(&get, "STRAND_MAX_DEPTH") {
            config = config.with_max_depth(v);
        }
        if let Some(v) = parse_var::<usize>(&get, "STRAND_CACHE_CAPACITY") {
            config = config.with_cache_capacity(v);
        }
        if let Some(v) = get("STRAND_CACHE") {
            config.cache_enabled = !(v == "0" || v.eq_ignore_ascii_case("false"));
        }
        config
    }
}

fn parse_var<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable runtime setting");
            None
        }
    }
}
