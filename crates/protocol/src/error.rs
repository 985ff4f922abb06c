//! Protocol error types

use thiserror::Error;

/// Errors raised while building or encoding controller packets
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Command does not fit the fixed command buffer (leaving room for the NUL)
    #[error("Oversized command: {len} bytes (max: {max})")]
    CommandTooLong { len: usize, max: usize },

    /// Command contains a NUL byte, which the controller reads as end of string
    #[error("Command contains a NUL byte at offset {position}")]
    InteriorNul { position: usize },

    /// Command is empty
    #[error("Command is empty")]
    EmptyCommand,
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::CommandTooLong { len: 70, max: 63 };
        let msg = format!("{}", err);
        assert!(msg.contains("Oversized command"));
        assert!(msg.contains("70"));
        assert!(msg.contains("63"));
    }

    #[test]
    fn test_interior_nul_error() {
        let err = ProtocolError::InteriorNul { position: 3 };
        assert!(format!("{}", err).contains("offset 3"));
    }
}
