//! Wire-visible status words (§6, §7).
//!
//! `Status` is data, not an error type in the `std::error::Error` sense — it is
//! the 32-bit value the dispatcher writes back to the target as the first
//! output of every execute (except `EXIT`, which emits no reply at all). It is
//! never wrapped in [`anyhow::Error`]; that crate is reserved for the outer
//! CLI/setup layer (opening the serial port, parsing argv) per §7's error-type
//! split.

use std::fmt;

/// A dispatch outcome: either success (status `0`) or one of the six wire
/// status words from §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    /// Arity, argument length, or null-termination requirement violated.
    BadInput = 1,
    /// An opcode produced an output whose shape the protocol rejects (e.g. an
    /// unrecognized `FSEEK` whence value).
    BadOutput = 2,
    /// Output allocation or argument-stack allocation failed.
    AllocFailed = 3,
    /// Writing a reply to the channel failed.
    Send = 4,
    /// Reading a frame from the channel failed.
    Receive = 5,
    /// A result item would exceed `MAX_STRING_LENGTH`.
    UnsupportedOutput = 6,
}

impl Status {
    /// The big-endian wire encoding of this status word.
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; 4] {
        (self as u32).to_be_bytes()
    }

    /// Whether this status indicates channel damage (§7 tier 2) rather than a
    /// recoverable protocol error (§7 tier 1).
    #[must_use]
    pub const fn is_channel_error(self) -> bool {
        matches!(self, Status::Send | Status::Receive)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::BadInput => "BAD_INPUT",
            Status::BadOutput => "BAD_OUTPUT",
            Status::AllocFailed => "ALLOC_FAILED",
            Status::Send => "SEND",
            Status::Receive => "RECEIVE",
            Status::UnsupportedOutput => "UNSUPPORTED_OUTPUT",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_encodes_as_nonzero_big_endian() {
        assert_eq!(Status::BadInput.to_be_bytes(), [0, 0, 0, 1]);
        assert_eq!(Status::UnsupportedOutput.to_be_bytes(), [0, 0, 0, 6]);
    }

    #[test]
    fn channel_errors_are_send_and_receive_only() {
        assert!(Status::Send.is_channel_error());
        assert!(Status::Receive.is_channel_error());
        assert!(!Status::BadInput.is_channel_error());
        assert!(!Status::AllocFailed.is_channel_error());
    }
}
