use chrono::Local;
use log::{Level, LevelFilter, Metadata, Record};
use std::io::Write;

/// Writes timestamped log lines to stderr
pub struct CliLogger {
    level: LevelFilter,
}

impl CliLogger {
    /// Info by default, debug with one `-v`, trace with two or more
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        Self { level }
    }

    pub fn init(self) -> Result<(), log::SetLoggerError> {
        let level = self.level;
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(level);
        Ok(())
    }
}

impl log::Log for CliLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut stderr = std::io::stderr().lock();
        let _ = if record.level() <= Level::Warn || self.level >= LevelFilter::Debug {
            writeln!(
                stderr,
                "{} {:<5} [{}] {}",
                timestamp,
                record.level(),
                record.target(),
                record.args()
            )
        } else {
            writeln!(stderr, "{} {:<5} {}", timestamp, record.level(), record.args())
        };
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
