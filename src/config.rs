use crate::error::{Error, Result};
use crate::executor::PanicStrategy;
use std::time::Duration;

const ENV_MAX_WORKERS: &str = "TASKPOOL_MAX_WORKERS";
const ENV_QUEUE_SIZE: &str = "TASKPOOL_QUEUE_SIZE";
const ENV_SAMPLE_INTERVAL: &str = "TASKPOOL_SAMPLE_INTERVAL_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    /// Number of worker threads, i.e. how many tasks run at once.
    pub max_workers: usize,
    /// Capacity of each admission buffer.
    pub queue_size: usize,
    pub thread_name_prefix: String,
    pub stack_size: Option<usize>,
    /// Period of the recurring sample producer.
    pub sample_interval: Duration,
    pub panic_strategy: PanicStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 10,
            queue_size: 100,
            thread_name_prefix: "taskpool-worker".to_string(),
            stack_size: Some(2 * 1024 * 1024),
            sample_interval: Duration::from_secs(30),
            panic_strategy: PanicStrategy::default(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Defaults overlaid with `TASKPOOL_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(n) = env_number(ENV_MAX_WORKERS)? {
            config.max_workers = env_usize(ENV_MAX_WORKERS, n)?;
        }
        if let Some(n) = env_number(ENV_QUEUE_SIZE)? {
            config.queue_size = env_usize(ENV_QUEUE_SIZE, n)?;
        }
        if let Some(secs) = env_number(ENV_SAMPLE_INTERVAL)? {
            config.sample_interval = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(Error::config("max_workers must be > 0"));
        }
        if self.max_workers > 1024 {
            return Err(Error::config("max_workers too large (max 1024)"));
        }
        if self.queue_size == 0 {
            return Err(Error::config("queue_size must be > 0"));
        }
        if self.sample_interval.is_zero() {
            return Err(Error::config("sample_interval must be non-zero"));
        }
        Ok(())
    }
}

fn env_number(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| Error::config(format!("{key}={raw:?}: {e}"))),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::config(format!("{key}: {e}"))),
    }
}

fn env_usize(key: &str, n: u64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::config(format!("{key}={n}: out of range for this platform")))
}

#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    pub fn queue_size(mut self, n: usize) -> Self {
        self.config.queue_size = n;
        self
    }

    pub fn thread_name_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.config.sample_interval = interval;
        self
    }

    pub fn panic_strategy(mut self, strategy: PanicStrategy) -> Self {
        self.config.panic_strategy = strategy;
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
