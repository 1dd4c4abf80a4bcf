//! Process logger setup.
//!
//! Built once at startup from [`LogSettings`]: records go to stderr and to a
//! daily-rotated `<log.path>/netbatch.<date>.log`, keeping the newest
//! `log.retention` files. `RUST_LOG` overrides the configured level. Keep the
//! returned [`LogGuard`] alive until shutdown.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use env_logger::{Builder, Env, Target};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::LogSettings;
use crate::error::Error;

/// Log file name prefix inside `log.path`.
pub const LOG_PREFIX: &str = "netbatch";

/// Log file extension.
pub const LOG_SUFFIX: &str = "log";

/// Flushes the logger when dropped.
#[must_use = "dropping the guard flushes and ends file logging setup"]
pub struct LogGuard {
    dir: PathBuf,
}

impl LogGuard {
    /// Directory holding the log files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        log::logger().flush();
    }
}

/// Writes every record to stderr and the rolling file.
struct Tee {
    file: RollingFileAppender,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Daily appender under `settings.path`, pruned to `settings.retention` files.
fn appender(settings: &LogSettings) -> Result<RollingFileAppender, Error> {
    std::fs::create_dir_all(&settings.path)
        .map_err(|e| Error::Logging(format!("cannot create {}: {e}", settings.path.display())))?;

    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix(LOG_SUFFIX)
        .max_log_files(settings.retention.max(1))
        .build(&settings.path)
        .map_err(|e| Error::Logging(format!("cannot open log in {}: {e}", settings.path.display())))
}

/// Install the global logger.
pub fn init(settings: &LogSettings) -> Result<LogGuard, Error> {
    let file = appender(settings)?;

    Builder::from_env(Env::default().default_filter_or(settings.level.as_str()))
        .target(Target::Pipe(Box::new(Tee { file })))
        .format_timestamp_secs()
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    Ok(LogGuard {
        dir: settings.path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dir: &Path) -> LogSettings {
        LogSettings {
            path: dir.join("logs"),
            level: "debug".into(),
            retention: 7,
        }
    }

    fn log_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| {
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                name.starts_with(LOG_PREFIX) && name.ends_with(LOG_SUFFIX)
            })
            .collect()
    }

    #[test]
    fn test_tee_writes_dated_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        let mut tee = Tee {
            file: appender(&settings).unwrap(),
        };
        tee.write_all(b"hello\n").unwrap();
        tee.flush().unwrap();

        let files = log_files(&settings.path);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        // netbatch.YYYY-MM-DD.log
        assert_eq!(name.len(), "netbatch.".len() + 10 + ".log".len(), "{name}");
        assert_eq!(std::fs::read_to_string(&files[0]).unwrap(), "hello\n");
    }

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings(dir.path());

        // Another test may already own the global logger.
        match init(&settings) {
            Ok(guard) => {
                log::error!("logger ready");
                assert_eq!(guard.dir(), settings.path.as_path());
                drop(guard);
                let files = log_files(&settings.path);
                let text = std::fs::read_to_string(&files[0]).unwrap();
                assert!(text.contains("logger ready"));
            }
            Err(Error::Logging(_)) => assert!(settings.path.is_dir()),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
