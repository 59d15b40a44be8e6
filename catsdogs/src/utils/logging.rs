//! Logging Module
//!
//! Structured logging setup using the `tracing` crate.

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging for CLI usage.
///
/// `verbose` switches the maximum level from INFO to DEBUG. Safe to call
/// more than once; later calls are no-ops.
pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    // Ignore the error if a subscriber is already installed (tests).
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{}h {}m", hours as u32, minutes as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(12.3), "12.3s");
        assert_eq!(format_duration(95.0), "1m 35s");
        assert_eq!(format_duration(3720.0), "1h 2m");
    }
}
