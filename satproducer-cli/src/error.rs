//! CLI error handling with user-friendly messages.

use satproducer::config::SettingsError;
use satproducer::message::MessageError;
use satproducer::product::ProductConfigError;
use std::fmt;
use std::process;

/// CLI-specific errors.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Producer settings could not be loaded
    Settings(SettingsError),
    /// Product configuration could not be loaded
    ProductConfig(ProductConfigError),
    /// Message file could not be read
    MessageRead { path: String, error: std::io::Error },
    /// Message could not be decoded
    Message(MessageError),
    /// Validation found problems
    Invalid(usize),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Settings(SettingsError::MissingKey { .. }) => {
                eprintln!();
                eprintln!("Required settings: instruments, product_config_file");
            }
            CliError::Message(_) => {
                eprintln!();
                eprintln!("Expected one line: pytroll://<subject> <type> <sender> <time> <version> application/json <data>");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Settings(e) => write!(f, "{}", e),
            CliError::ProductConfig(e) => write!(f, "{}", e),
            CliError::MessageRead { path, error } => {
                write!(f, "Failed to read message '{}': {}", path, error)
            }
            CliError::Message(e) => write!(f, "Invalid message: {}", e),
            CliError::Invalid(count) => write!(f, "Configuration has {} problem(s)", count),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Settings(e) => Some(e),
            CliError::ProductConfig(e) => Some(e),
            CliError::MessageRead { error, .. } => Some(error),
            CliError::Message(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(e: SettingsError) -> Self {
        CliError::Settings(e)
    }
}

impl From<ProductConfigError> for CliError {
    fn from(e: ProductConfigError) -> Self {
        CliError::ProductConfig(e)
    }
}

impl From<MessageError> for CliError {
    fn from(e: MessageError) -> Self {
        CliError::Message(e)
    }
}
