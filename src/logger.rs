use chrono::Local;
use env_logger::Builder;
use log::{info, LevelFilter};
use std::io::Write;
use std::path::Path;

pub struct Logger;

impl Logger {
    /// Installs the global logger. Debug builds write to stderr; release
    /// builds write to `log_path`, falling back to stderr when the file
    /// cannot be created.
    pub fn initialize(level: LevelFilter, log_path: &Path) {
        let mut builder = Builder::new();
        builder
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} [{}] - {}",
                    Local::now().format("%Y-%m-%d %H:%M:%S"),
                    record.level(),
                    record.args()
                )
            })
            .filter(None, level);

        #[cfg(debug_assertions)]
        {
            let _ = log_path;
            if builder.try_init().is_ok() {
                info!("Debug mode: Logging to console.");
            }
        }

        #[cfg(not(debug_assertions))]
        {
            let file = log_path
                .parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|_| std::fs::File::create(log_path));
            match file {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                    if builder.try_init().is_ok() {
                        info!("Release mode: Logging to file at {:?}", log_path);
                    }
                }
                Err(err) => {
                    if builder.try_init().is_ok() {
                        log::warn!("Unable to create log file at {:?}, logging to stderr: {}", log_path, err);
                    }
                }
            }
        }
    }
}
