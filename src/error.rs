//! Error types for the telemetry hub

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Packet decoding errors
///
/// These never leave the ingress loop; a rejected datagram is counted and dropped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Packet is not valid UTF-8")]
    InvalidUtf8,

    #[error("Too few fields: {0}")]
    TooFewFields(usize),

    #[error("Empty device identifier")]
    EmptyDevice,

    #[error("Expected 'temp' token, got {0:?}")]
    UnexpectedToken(String),

    #[error("Invalid temperature: {0:?}")]
    InvalidTemperature(String),

    #[error("Missing vote field")]
    MissingVote,

    #[error("Invalid vote: {0:?}")]
    InvalidVote(String),
}

/// Device store lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Device not found: {0}")]
    NotFound(String),
}

/// Subscriber delivery failures, resolved by evicting the subscriber
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("Subscriber queue full")]
    Full,

    #[error("Subscriber channel closed")]
    Closed,
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("HTTP listen failed: {0}")]
    ListenFailed(String),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
