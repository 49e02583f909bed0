/*!

Logging for sweeps.

Code throughout the crate logs through the [`log`](https://docs.rs/log) facade macros, which are
re-exported here. Output is off until [`enable_logging`] installs a `log4rs` console logger
writing to stderr; afterwards [`set_log_level`] and [`disable_logging`] reconfigure the same
logger through its retained handle.

*/

use std::sync::{Mutex, MutexGuard, OnceLock};

pub use log::{debug, error, info, trace, warn, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;

const CONSOLE_APPENDER: &str = "stderr";
const PATTERN: &str = "{d(%H:%M:%S%.3f)} {h({l:<5})} {t} - {m}{n}";

static LOG_HANDLE: OnceLock<Mutex<Option<Handle>>> = OnceLock::new();

fn log_handle() -> MutexGuard<'static, Option<Handle>> {
    LOG_HANDLE
        .get_or_init(|| Mutex::new(None))
        .lock()
        // A panic while holding the lock leaves nothing half-written; keep going.
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn build_config(level: LevelFilter) -> Config {
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();
    Config::builder()
        .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(stderr)))
        .build(Root::builder().appender(CONSOLE_APPENDER).build(level))
        // The configuration is fixed and always names an appender that exists.
        .unwrap()
}

/// Installs the console logger at `Info`, or restores that level if it was already installed.
pub fn enable_logging() {
    set_log_level(LevelFilter::Info);
}

/// Sets the level of the console logger, installing it first if needed.
pub fn set_log_level(level: LevelFilter) {
    let mut handle = log_handle();
    match handle.as_ref() {
        Some(handle) => handle.set_config(build_config(level)),
        None => match log4rs::init_config(build_config(level)) {
            Ok(new_handle) => *handle = Some(new_handle),
            // Another logger owns the facade; leave it in charge.
            Err(e) => eprintln!("could not install console logger: {e}"),
        },
    }
}

/// Silences all output. The logger stays installed and can be re-enabled.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_can_be_reconfigured() {
        set_log_level(LevelFilter::Trace);
        trace!("logging at trace");
        assert_eq!(log::max_level(), LevelFilter::Trace);

        disable_logging();
        assert_eq!(log::max_level(), LevelFilter::Off);

        enable_logging();
        assert_eq!(log::max_level(), LevelFilter::Info);
        disable_logging();
    }
}
