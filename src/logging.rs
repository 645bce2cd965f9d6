use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt;

/// Logs to stderr so command output on stdout stays clean. Warnings are
/// always shown; `--verbose` adds info and debug lines with timestamps.
pub fn init(verbose: bool) -> Result<()> {
    let builder = fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);
    let _ = if verbose {
        builder.with_max_level(Level::DEBUG).try_init()
    } else {
        builder
            .with_max_level(Level::WARN)
            .without_time()
            .try_init()
    };
    Ok(())
}
