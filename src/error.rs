use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Errors that can occur while resolving or controlling SoundTouch speakers
#[derive(Error, Debug)]
pub enum BridgeError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Speaker answered with a non-success status
    #[error("HTTP status {status} from {url}")]
    HttpStatus {
        /// Status code returned by the speaker
        status: u16,
        /// Requested URL
        url: String,
    },

    /// XML deserialization error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Device info lacks the fields needed to identify it
    #[error("Device not identifiable: missing {0}")]
    DeviceUnidentifiable(&'static str),

    /// No device answered for the configured room
    #[error("Device not found for accessory '{name}'")]
    DeviceNotFound {
        /// Configured display name (or room) of the accessory
        name: String,
    },

    /// Platform configuration is absent or unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Preset or source is not exposed on this accessory
    #[error("Not exposed: {0}")]
    NotExposed(String),

    /// Channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}
