#![forbid(unsafe_op_in_unsafe_fn)]

use env_logger::{Builder, WriteStyle};
use log::LevelFilter;
use mmcheck_core::handler::{self, FailureHandler};
use thiserror::Error;

use std::io::Write;

pub const ENV_LOG: &str = "MMCHECK_LOG";
pub const ENV_LOG_COLORS: &str = "MMCHECK_LOG_COLORS";
pub const ENV_LOG_MODULE: &str = "MMCHECK_LOG_MODULE";

#[derive(Debug, Clone)]
pub struct ConsoleLoggerConfig {
    pub level: LevelFilter,
    pub colors: bool,
    pub include_module: bool,
}

impl ConsoleLoggerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(env: impl Fn(&str) -> Option<String>) -> Self {
        let level = env(ENV_LOG)
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        let colors = env(ENV_LOG_COLORS).map(|v| v != "0").unwrap_or(true);
        let include_module = env(ENV_LOG_MODULE).map(|v| v != "0").unwrap_or(true);

        Self {
            level,
            colors,
            include_module,
        }
    }
}

impl Default for ConsoleLoggerConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("logger init failed: {0}")]
    Init(#[from] log::SetLoggerError),
}

pub struct ConsoleLogger {
    config: ConsoleLoggerConfig,
    initialized: bool,
}

impl ConsoleLogger {
    #[inline]
    pub fn new(config: ConsoleLoggerConfig) -> Self {
        Self {
            config,
            initialized: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &ConsoleLoggerConfig {
        &self.config
    }

    /// Installs the process-wide logger. A second call on the same value is a
    /// no-op; a second logger in the same process is an error.
    pub fn init(&mut self) -> Result<(), LoggingError> {
        if self.initialized {
            return Ok(());
        }

        let mut builder = Builder::new();
        builder.filter_level(self.config.level);
        builder.write_style(if self.config.colors {
            WriteStyle::Auto
        } else {
            WriteStyle::Never
        });

        let include_module = self.config.include_module;
        builder.format(move |buf, record| {
            let style = buf.default_level_style(record.level());
            if include_module {
                writeln!(
                    buf,
                    "[{style}{:<5}{style:#}] {:<25} {}",
                    record.level(),
                    record.target(),
                    record.args()
                )
            } else {
                writeln!(buf, "[{style}{:<5}{style:#}] {}", record.level(), record.args())
            }
        });

        builder.try_init()?;

        self.initialized = true;
        Ok(())
    }
}

/// Failure handler that logs the failure at `error` level and aborts.
///
/// Formats through the `log` facade, so it allocates; keep the default
/// handler where failures can be raised from inside the allocator.
pub fn log_abort_handler(message: &str, id: &str, file: &str, line: u32) {
    log::error!(target: "mmcheck", "{file}:{line}: {id} failure: {message}");
    log::logger().flush();
    std::process::abort();
}

/// Failure handler that logs the failure at `error` level and returns.
pub fn log_continue_handler(message: &str, id: &str, file: &str, line: u32) {
    log::error!(target: "mmcheck", "{file}:{line}: {id} failure: {message}");
}

/// Installs one of the logging handlers and returns the previous one.
pub fn install_log_handler(abort: bool) -> FailureHandler {
    let h: FailureHandler = if abort {
        log_abort_handler
    } else {
        log_continue_handler
    };
    handler::install(h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmcheck_core::Capture;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())
    }

    #[test]
    fn defaults_without_env() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.level, LevelFilter::Info);
        assert!(cfg.colors);
        assert!(cfg.include_module);
    }

    #[test]
    fn env_overrides_level_and_switches() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[
            (ENV_LOG, "debug"),
            (ENV_LOG_COLORS, "0"),
            (ENV_LOG_MODULE, "0"),
        ]));
        assert_eq!(cfg.level, LevelFilter::Debug);
        assert!(!cfg.colors);
        assert!(!cfg.include_module);
    }

    #[test]
    fn bad_level_falls_back_to_info() {
        let cfg = ConsoleLoggerConfig::from_lookup(lookup(&[(ENV_LOG, "chatty")]));
        assert_eq!(cfg.level, LevelFilter::Info);
    }

    #[test]
    fn second_logger_is_rejected() {
        let mut first = ConsoleLogger::new(ConsoleLoggerConfig::from_lookup(lookup(&[])));
        let mut second = ConsoleLogger::new(ConsoleLoggerConfig::from_lookup(lookup(&[])));
        first.init().unwrap();
        first.init().unwrap();
        assert!(matches!(second.init(), Err(LoggingError::Init(_))));
    }

    #[test]
    fn continue_handler_returns() {
        log_continue_handler("pool.align > 0", "standard", "pool.rs", 3);
    }

    #[test]
    fn install_log_handler_swaps_binding() {
        Capture::new().run(|| {
            let prev = install_log_handler(false);
            assert_eq!(
                handler::current() as usize,
                log_continue_handler as usize
            );
            handler::install(prev);
        });
    }
}
