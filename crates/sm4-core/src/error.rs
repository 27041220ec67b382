//! Error type shared by the mode layer, the GCM engine, and backend configuration.

use thiserror::Error;

/// Errors reported at the API boundary. The block transform itself never fails.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// A buffer, nonce, or tag has a length the operation cannot accept.
    #[error("invalid {what} length {actual}: expected {expected}")]
    InvalidLength {
        /// What was being measured (`"ECB input"`, `"tag"`, ...).
        what: &'static str,
        /// Human-readable description of the accepted lengths.
        expected: &'static str,
        /// Length that was supplied, in bytes.
        actual: usize,
    },

    /// A backend name did not match any known implementation.
    #[error("unknown backend `{0}` (expected reference, table, or vector)")]
    UnknownBackend(String),

    /// The GCM tag did not match; no plaintext was released.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// A GCM session call arrived in a phase that does not permit it.
    #[error("cannot {operation} while the session is {phase}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// Phase the session was in.
        phase: &'static str,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

pub(crate) fn ensure_block_aligned(what: &'static str, len: usize) -> Result<()> {
    if len % crate::BLOCK_SIZE != 0 {
        return Err(Error::InvalidLength {
            what,
            expected: "a multiple of 16 bytes",
            actual: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_length() {
        let err = ensure_block_aligned("ECB input", 17).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid ECB input length 17: expected a multiple of 16 bytes"
        );
        assert!(ensure_block_aligned("ECB input", 32).is_ok());
        assert!(ensure_block_aligned("ECB input", 0).is_ok());
    }
}
