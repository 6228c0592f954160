use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::errors::{LedgerError, Result};

/// install the global subscriber: stderr, or append to `config.file`
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|err| LedgerError::invalid_parameter("log_level", err.to_string()))?;

    let installed = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|err| LedgerError::invalid_parameter("logging", err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_filter() {
        let config = LoggingConfig {
            level: "loan_approval_rs=loudest".to_string(),
            file: None,
        };
        assert!(matches!(init(&config), Err(LedgerError::InvalidParameter { .. })));
    }
}
