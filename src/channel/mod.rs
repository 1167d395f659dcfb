//! Channel I/O (§4.1): blocking byte reader/writer over a file descriptor or
//! OS serial handle, with startup resynchronization on a literal sentinel.
//!
//! The abstraction is a small `Channel` trait implemented once per backend,
//! the same shape as the teacher's `BrokerConnection` (a blocking `std::io`
//! type wrapping a concrete stream) rather than an async `tokio` type — the
//! spec's concurrency model (§5) is strictly single-threaded blocking I/O, so
//! the channel stays on `std::io::{Read, Write}` and carries no `tokio`
//! dependency (dropped per `DESIGN.md`).

pub mod handshake;
pub mod pipe;
pub mod serial;

use std::io::{self, Read, Write};

use crate::constants::RESYNC_SENTINEL;
use crate::error::Status;

/// A byte channel to the embedded target: a serial line or a pipe pair.
///
/// Implementors need only provide blocking `Read`/`Write`; `send_break`
/// defaults to a no-op since only the serial backend can drive a real BREAK
/// condition (§4.8).
pub trait Channel: Read + Write {
    /// Sends a BREAK condition on the line for `duration` (§4.8). Backends
    /// that cannot (e.g. a plain pipe) leave this a no-op.
    fn send_break(&mut self, duration: std::time::Duration) -> io::Result<()> {
        let _ = duration;
        Ok(())
    }
}

/// Reads exactly `n` bytes or fails with [`Status::Receive`] (§4.1).
pub fn read_exact<C: Channel + ?Sized>(channel: &mut C, n: usize) -> Result<Vec<u8>, Status> {
    let mut buf = vec![0u8; n];
    channel.read_exact(&mut buf).map_err(|_| Status::Receive)?;
    Ok(buf)
}

/// Writes every byte of `buf` or fails with [`Status::Send`] (§4.1).
pub fn write_all<C: Channel + ?Sized>(channel: &mut C, buf: &[u8]) -> Result<(), Status> {
    channel.write_all(buf).map_err(|_| Status::Send)
}

/// Discards bytes from `channel` until two consecutive `'{'` bytes have been
/// seen, forwarding every discarded byte to `debug` (§4.1: "startup
/// resynchronization"). Performed once, before the first framed read of a
/// session.
///
/// # Errors
///
/// Returns [`Status::Receive`] if the channel fails before resync completes.
pub fn resync<C: Channel + ?Sized>(channel: &mut C, mut debug: impl FnMut(u8)) -> Result<(), Status> {
    let mut seen = [0u8; 2];
    let mut filled = 0usize;
    loop {
        let mut byte = [0u8; 1];
        channel.read_exact(&mut byte).map_err(|_| Status::Receive)?;
        debug(byte[0]);

        if filled < 2 {
            seen[filled] = byte[0];
            filled += 1;
        } else {
            seen[0] = seen[1];
            seen[1] = byte[0];
        }

        if filled == 2 && seen == RESYNC_SENTINEL {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    impl Channel for Cursor<Vec<u8>> {}

    #[test]
    fn resync_discards_boot_chatter_up_to_sentinel() {
        let mut chan = Cursor::new(b"garbage..{{rest".to_vec());
        let mut discarded = Vec::new();
        resync(&mut chan, |b| discarded.push(b)).unwrap();

        assert_eq!(discarded, b"garbage..{{".to_vec());
        let mut rest = Vec::new();
        chan.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"rest");
    }

    #[test]
    fn resync_on_empty_channel_fails_receive() {
        let mut chan = Cursor::new(Vec::new());
        assert_eq!(resync(&mut chan, |_| {}), Err(Status::Receive));
    }

    #[test]
    fn read_exact_short_channel_fails_receive() {
        let mut chan = Cursor::new(vec![1, 2]);
        assert_eq!(read_exact(&mut chan, 5), Err(Status::Receive));
    }

    #[test]
    fn read_exact_returns_requested_bytes() {
        let mut chan = Cursor::new(vec![1, 2, 3, 4]);
        assert_eq!(read_exact(&mut chan, 3).unwrap(), vec![1, 2, 3]);
    }
}
