//! Error types for the SWS socket protocol.

use std::io;
use thiserror::Error;

/// Result type alias for socket operations.
pub type Result<T> = std::result::Result<T, SwsError>;

/// Errors that can occur while talking to a Wi-Fi socket.
#[derive(Debug, Error)]
pub enum SwsError {
    /// Invalid parameter provided by the caller.
    ///
    /// Raised before any network I/O; a request built from bad input is
    /// never sent.
    #[error("Invalid parameter '{parameter}': {reason}")]
    InvalidParameter {
        /// Name of the invalid parameter.
        parameter: String,
        /// Description of why the parameter is invalid.
        reason: String,
    },

    /// Encryption or decryption failed.
    ///
    /// For decryption this usually means a corrupted or foreign datagram
    /// whose payload is not a positive multiple of the AES block size.
    #[error("Cipher error: {reason}")]
    Cipher {
        /// Description of the cipher failure.
        reason: String,
    },

    /// No reply within the timeout window, across all retries.
    #[error("Communication timeout")]
    Timeout,

    /// Reply decrypted but did not match the expected shape for the
    /// command that was sent.
    #[error("Malformed reply: {reason}")]
    MalformedReply {
        /// Description of the shape mismatch.
        reason: String,
    },

    /// Reply explicitly encodes a failure status.
    #[error("Device rejected the command")]
    DeviceRejected,

    /// Timestamp outside the device's representable 32-bit range.
    #[error("Time outside the representable 32-bit timestamp range")]
    TimeOutOfRange,

    /// I/O error during communication.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl SwsError {
    /// Creates a new `InvalidParameter` error.
    ///
    /// # Example
    ///
    /// ```
    /// use silvercrest_sws::SwsError;
    ///
    /// let err = SwsError::invalid_parameter("timer", "must be 1-10 or countdown");
    /// ```
    pub fn invalid_parameter(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new `Cipher` error.
    ///
    /// # Example
    ///
    /// ```
    /// use silvercrest_sws::SwsError;
    ///
    /// let err = SwsError::cipher("ciphertext length 17 is not a multiple of 16");
    /// ```
    pub fn cipher(reason: impl Into<String>) -> Self {
        Self::Cipher {
            reason: reason.into(),
        }
    }

    /// Creates a new `MalformedReply` error.
    ///
    /// # Example
    ///
    /// ```
    /// use silvercrest_sws::SwsError;
    ///
    /// let err = SwsError::malformed_reply("reply too short");
    /// ```
    pub fn malformed_reply(reason: impl Into<String>) -> Self {
        Self::MalformedReply {
            reason: reason.into(),
        }
    }

    /// Returns whether this outcome may be fixed by resending the same
    /// frame. Only an absent reply qualifies; validation, cipher, and
    /// decode failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_display() {
        let err = SwsError::invalid_parameter("mac", "must decode to exactly 6 bytes");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'mac': must decode to exactly 6 bytes"
        );
    }

    #[test]
    fn test_cipher_display() {
        let err = SwsError::cipher("empty ciphertext");
        assert_eq!(err.to_string(), "Cipher error: empty ciphertext");
    }

    #[test]
    fn test_timeout_display() {
        let err = SwsError::Timeout;
        assert_eq!(err.to_string(), "Communication timeout");
    }

    #[test]
    fn test_malformed_reply_display() {
        let err = SwsError::malformed_reply("unexpected opcode echo");
        assert_eq!(err.to_string(), "Malformed reply: unexpected opcode echo");
    }

    #[test]
    fn test_only_timeout_is_retryable() {
        assert!(SwsError::Timeout.is_retryable());
        assert!(!SwsError::DeviceRejected.is_retryable());
        assert!(!SwsError::cipher("x").is_retryable());
        assert!(!SwsError::malformed_reply("x").is_retryable());
        assert!(!SwsError::invalid_parameter("p", "r").is_retryable());
    }
}
