use env_logger::{Builder, Target, WriteStyle};
use log::{error, info, warn, LevelFilter};
use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

/// Initialize the logging system, writing to `log_file` when given and stderr otherwise
pub fn initialize_logging(
    log_file: Option<&Path>,
    level: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);

    let mut builder = Builder::new();
    builder
        .filter_level(level)
        .format_timestamp_secs()
        .format_module_path(true)
        .write_style(WriteStyle::Auto);

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    } else {
        builder.target(Target::Stderr);
    }

    builder.try_init()?;

    info!("Logging system initialized");
    Ok(())
}

/// Helper function to format sensitive data for logging
pub(crate) fn format_sensitive(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Structured logging for authentication events
pub fn log_auth_event(event_type: &str, subject: &str, success: bool, details: Option<&str>) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Auth event: type={}, subject={}, success=true, timestamp={}, details={:?}",
            event_type,
            format_sensitive(subject),
            timestamp,
            details
        );
    } else {
        warn!(
            "Auth event: type={}, subject={}, success=false, timestamp={}, details={:?}",
            event_type,
            format_sensitive(subject),
            timestamp,
            details
        );
    }
}

/// Structured logging for data operations
pub fn log_data_operation(
    operation: &str,
    subject: &str,
    resource: &str,
    success: bool,
    details: Option<&str>,
) {
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    if success {
        info!(
            "Data operation: op={}, subject={}, resource={}, success=true, timestamp={}, details={:?}",
            operation,
            format_sensitive(subject),
            resource,
            timestamp,
            details
        );
    } else {
        error!(
            "Data operation: op={}, subject={}, resource={}, success=false, timestamp={}, details={:?}",
            operation,
            format_sensitive(subject),
            resource,
            timestamp,
            details
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_data_formatting() {
        assert_eq!(format_sensitive("admin@cse"), "ad***se");
        assert_eq!(format_sensitive("a@x.edu"), "a@***du");
        assert_eq!(format_sensitive("key"), "***");
        assert_eq!(format_sensitive(""), "");
    }

    #[test]
    fn test_logging_initialization() {
        let log_file = tempfile::NamedTempFile::new().unwrap();

        // A second initialization in the same test binary reports an error instead of panicking
        let first = initialize_logging(Some(log_file.path()), "debug");
        let second = initialize_logging(None, "info");
        assert!(first.is_ok() || second.is_err());
        assert!(second.is_err());
    }
}
