use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{format::FmtSpan, writer::MakeWriterExt},
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const REMINDER_PREFIX: &str = "reminder";

const KEPT_LOG_FILES: usize = 5;

/// Sets up logging into `<application_data_path>/logs`, one file per day and prefix. Stderr only
/// gets a copy with `echo_to_stderr`, stdout belongs to the reminder conversation.
pub fn enable_logging(
    prefix: &str,
    application_data_path: &Path,
    log_level: Option<LevelFilter>,
    echo_to_stderr: bool,
) -> Result<()> {
    // Pruning old files complains on stderr when the directory is missing.
    let log_dir = application_data_path.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(KEPT_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)?;

    let stderr = std::io::stderr.with_filter(move |_| echo_to_stderr);
    let env_level = std::env::var("RUST_LOG").ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(crate_directive(log_level, env_level.as_deref())))
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(stderr.and(appender))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Only this crate logs. An explicit level wins over `RUST_LOG`, which wins over `info`.
fn crate_directive(log_level: Option<LevelFilter>, env_level: Option<&str>) -> String {
    let level = match (log_level, env_level) {
        (Some(level), _) => level.to_string(),
        (None, Some(level)) if !level.trim().is_empty() => level.trim().to_string(),
        _ => LevelFilter::INFO.to_string(),
    };
    format!("{}={level}", env!("CARGO_PKG_NAME").replace('-', "_"))
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .try_init();
});

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::crate_directive;

    #[test]
    fn test_crate_directive() {
        assert_eq!(crate_directive(None, None), "hydrowatch=info");
        assert_eq!(crate_directive(None, Some(" ")), "hydrowatch=info");
        assert_eq!(crate_directive(None, Some("trace")), "hydrowatch=trace");
        assert_eq!(
            crate_directive(Some(LevelFilter::DEBUG), Some("trace")),
            "hydrowatch=debug"
        );
    }
}
