//! Pool and scheduler configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default upper bound on worker threads.
pub const DEFAULT_MAX_WORKERS_CAP: usize = 32;
/// Default recurring-job interval, in `unit`s.
pub const DEFAULT_INTERVAL: f64 = 5.0;
/// Default iteration bound for recurring jobs.
pub const DEFAULT_LIMIT: u64 = 999_999;
/// Default polling interval (seconds) of a completion watcher.
pub const DEFAULT_COMPLETION_INTERVAL: f64 = 1.0;

const ENV_PREFIX: &str = "TASKGATE_";

/// Calendar unit attached to a recurring job's interval.
///
/// The unit only decides how often the job is *due*. The scheduler thread always sleeps
/// `interval` seconds between passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    /// Seconds.
    #[default]
    Seconds,
    /// Minutes.
    Minutes,
    /// Hours.
    Hours,
    /// Days.
    Days,
    /// Weeks.
    Weeks,
}

impl TimeUnit {
    /// Length of one unit in seconds.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 3_600,
            Self::Days => 86_400,
            Self::Weeks => 604_800,
        }
    }

    /// Parse a unit name, accepting singular and plural spellings.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().trim_end_matches('s') {
            "second" => Some(Self::Seconds),
            "minute" => Some(Self::Minutes),
            "hour" => Some(Self::Hours),
            "day" => Some(Self::Days),
            "week" => Some(Self::Weeks),
            _ => None,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Upper bound on worker threads.
    pub max_workers_cap: usize,
    /// Core count to size from; `None` asks the operating system.
    pub cores_override: Option<usize>,
    /// Bound on tasks handed to the pool but not yet picked up; `None` is unbounded.
    pub max_queue_depth: Option<usize>,
    /// Stack size for worker threads in bytes.
    pub thread_stack_size: usize,
    /// How long a waiting shutdown waits for each worker before detaching it.
    pub shutdown_join_timeout_ms: u64,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers_cap: DEFAULT_MAX_WORKERS_CAP,
            cores_override: None,
            max_queue_depth: None,
            thread_stack_size: 2 * 1024 * 1024,
            shutdown_join_timeout_ms: 2_000,
            thread_name_prefix: "taskgate-worker".into(),
        }
    }
}

impl PoolConfig {
    /// Create a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worker cap.
    #[must_use]
    pub const fn with_max_workers_cap(mut self, cap: usize) -> Self {
        self.max_workers_cap = cap;
        self
    }

    /// Pin the core count instead of querying the OS.
    #[must_use]
    pub const fn with_cores(mut self, cores: usize) -> Self {
        self.cores_override = Some(cores);
        self
    }

    /// Bound the pool's hand-off channel.
    #[must_use]
    pub const fn with_max_queue_depth(mut self, depth: usize) -> Self {
        self.max_queue_depth = Some(depth);
        self
    }

    /// Set the worker join timeout used by waiting shutdowns.
    #[must_use]
    pub fn with_shutdown_join_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_join_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Cores the pool is sized from.
    #[must_use]
    pub fn cores(&self) -> usize {
        self.cores_override.unwrap_or_else(num_cpus::get).max(1)
    }

    /// `min(2 * cores, cap)`, never below 1.
    #[must_use]
    pub fn max_workers(&self) -> usize {
        self.cores().saturating_mul(2).min(self.max_workers_cap).max(1)
    }

    /// Permits for the submission gate: one below `max_workers`, floored at 1.
    #[must_use]
    pub fn submission_permits(&self) -> usize {
        self.max_workers().saturating_sub(1).max(1)
    }

    /// Join timeout as a `Duration`.
    #[must_use]
    pub const fn shutdown_join_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_join_timeout_ms)
    }

    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers_cap == 0 {
            return Err("max_workers_cap must be greater than 0".into());
        }
        if self.cores_override == Some(0) {
            return Err("cores_override must be greater than 0".into());
        }
        if self.max_queue_depth == Some(0) {
            return Err("max_queue_depth must be greater than 0".into());
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        Ok(())
    }
}

/// Defaults applied to recurring schedulers and completion watchers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Interval used when a caller does not pass one.
    pub default_interval: f64,
    /// Unit used when a caller does not pass one.
    pub default_unit: TimeUnit,
    /// Iteration bound used when a caller does not pass one.
    pub default_limit: u64,
    /// Polling interval (seconds) for completion watchers.
    pub completion_interval: f64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_INTERVAL,
            default_unit: TimeUnit::Seconds,
            default_limit: DEFAULT_LIMIT,
            completion_interval: DEFAULT_COMPLETION_INTERVAL,
        }
    }
}

impl ScheduleConfig {
    /// Validate scheduler defaults.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.default_interval.is_finite() && self.default_interval > 0.0) {
            return Err("default_interval must be a positive number".into());
        }
        if !(self.completion_interval.is_finite() && self.completion_interval > 0.0) {
            return Err("completion_interval must be a positive number".into());
        }
        Ok(())
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Worker pool settings.
    pub pool: PoolConfig,
    /// Scheduler defaults.
    pub schedule: ScheduleConfig,
}

impl TasksConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.pool.validate().map_err(|e| format!("pool invalid: {e}"))?;
        self.schedule
            .validate()
            .map_err(|e| format!("schedule invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `TASKGATE_*` environment variables, loading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary `TASKGATE_*` key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();

        if let Some(v) = get("MAX_WORKERS_CAP") {
            cfg.pool.max_workers_cap = parse_var("MAX_WORKERS_CAP", &v)?;
        }
        if let Some(v) = get("CORES") {
            cfg.pool.cores_override = Some(parse_var("CORES", &v)?);
        }
        if let Some(v) = get("MAX_QUEUE_DEPTH") {
            cfg.pool.max_queue_depth = Some(parse_var("MAX_QUEUE_DEPTH", &v)?);
        }
        if let Some(v) = get("THREAD_STACK_SIZE") {
            cfg.pool.thread_stack_size = parse_var("THREAD_STACK_SIZE", &v)?;
        }
        if let Some(v) = get("SHUTDOWN_JOIN_TIMEOUT_MS") {
            cfg.pool.shutdown_join_timeout_ms = parse_var("SHUTDOWN_JOIN_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = get("INTERVAL") {
            cfg.schedule.default_interval = parse_var("INTERVAL", &v)?;
        }
        if let Some(v) = get("UNIT") {
            cfg.schedule.default_unit =
                TimeUnit::parse(&v).ok_or_else(|| format!("{ENV_PREFIX}UNIT: unknown unit `{v}`"))?;
        }
        if let Some(v) = get("LIMIT") {
            cfg.schedule.default_limit = parse_var("LIMIT", &v)?;
        }
        if let Some(v) = get("COMPLETION_INTERVAL") {
            cfg.schedule.completion_interval = parse_var("COMPLETION_INTERVAL", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}: {e}"))
}
