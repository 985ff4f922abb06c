//! Common error types

use protocol::{ProtocolError, UsbError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Device enumeration failed: {0}")]
    Enumeration(#[source] UsbError),

    #[error("No Performax devices found")]
    NoDevices,

    #[error("Error opening device {index}: {source}")]
    Open {
        index: u32,
        #[source]
        source: UsbError,
    },

    #[error("Error setting timeouts: {0}")]
    TimeoutConfig(#[source] UsbError),

    #[error("Command {command} failed: {source}")]
    SendRecv {
        command: String,
        #[source]
        source: UsbError,
    },

    #[error("Error flushing comms: {0}")]
    Flush(#[source] UsbError),

    #[error("Error disconnecting device: {0}")]
    Close(#[source] UsbError),

    #[error("Device session is not connected")]
    NotConnected,

    #[error("Device session is already connected")]
    AlreadyConnected,

    #[error("Invalid command: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`Error`], stable across message changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Enumeration,
    Open,
    TimeoutConfig,
    SendRecv,
    Flush,
    Close,
    NotConnected,
    AlreadyConnected,
    InvalidCommand,
    Channel,
    Config,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            // An empty bus is an enumeration failure, not an open failure
            Error::Enumeration(_) | Error::NoDevices => ErrorKind::Enumeration,
            Error::Open { .. } => ErrorKind::Open,
            Error::TimeoutConfig(_) => ErrorKind::TimeoutConfig,
            Error::SendRecv { .. } => ErrorKind::SendRecv,
            Error::Flush(_) => ErrorKind::Flush,
            Error::Close(_) => ErrorKind::Close,
            Error::NotConnected => ErrorKind::NotConnected,
            Error::AlreadyConnected => ErrorKind::AlreadyConnected,
            Error::Protocol(_) => ErrorKind::InvalidCommand,
            Error::Channel(_) => ErrorKind::Channel,
            Error::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
