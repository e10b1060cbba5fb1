use std::ffi::OsStr;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

fn filter(debug: bool) -> EnvFilter {
    // Without debug logging the level is pinned to `info` so a stray
    // `RUST_LOG` in the environment cannot turn on verbose output.
    if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::new("info")
    }
}

/// Initialise logging to stderr and, when `log_file` is given, to that file.
///
/// Returns the guard of the file writer; logs are flushed when it is dropped.
/// Calling this again after a subscriber was installed is a no-op.
pub fn init(debug: bool, log_file: Option<&Path>) -> Option<WorkerGuard> {
    let Some(path) = log_file else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter(debug))
            .try_init();
        return None;
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path.file_name().unwrap_or_else(|| OsStr::new("dashboard.log"));
    let appender = tracing_appender::rolling::never(dir, name);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_ansi(false)
        .with_writer(std::io::stderr.and(file_writer))
        .try_init()
        .is_ok();
    installed.then_some(guard)
}
