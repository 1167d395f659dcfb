//! Serial port setup (§4.8): cross-platform line configuration and BREAK.
//!
//! The teacher has no serial-port code, but solves the structurally
//! identical problem — one capability that differs completely between
//! platforms — by reaching for `portable-pty` rather than hand-rolling
//! `openpty`/`CreatePseudoConsole` twice. This module follows the same idiom
//! with the `serialport` crate: one `SerialPort` trait supplies
//! `set_baud_rate`, `set_data_bits`, `set_flow_control`, `set_timeout`, and
//! `set_break`/`clear_break`, covering the termios/DCB configuration and the
//! BREAK signal on both families (Unix `O_NOCTTY|O_CLOEXEC|O_SYNC` +
//! raw-mode termios, Windows `CreateFile` + DCB) without any platform `cfg`
//! blocks in this module itself — the split the spec describes in prose is
//! pushed down into the crate's own backend.

use std::io::{self, Read, Write};
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use serialport::{DataBits, FlowControl, Parity, StopBits};

use crate::constants::SERIAL_READ_TIMEOUT;

use super::Channel;

/// Baud rate for the mbed TLS target line. Not specified by the retrieved
/// spec fragment; 115200 is the common default for mbed TLS test targets and
/// is recorded as an assumption in `DESIGN.md`.
pub const BAUD_RATE: u32 = 115_200;

/// A channel backed by a physical or virtual serial port.
#[derive(Debug)]
pub struct SerialChannel {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialChannel {
    /// Opens and configures `path` per §4.8: 8N1, no flow control, no
    /// parity, blocking reads with a 0.5s inter-byte timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened or configured.
    pub fn open(path: &Path) -> Result<Self> {
        let mut port = serialport::new(path.to_string_lossy(), BAUD_RATE)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(SERIAL_READ_TIMEOUT)
            .open()
            .with_context(|| format!("open serial port {}", path.display()))?;

        // VMIN=1 equivalent: a read() call blocks until at least one byte is
        // available, which `serialport`'s default blocking mode already
        // provides once a timeout is set.
        port.set_timeout(SERIAL_READ_TIMEOUT)
            .context("set serial port inter-byte timeout")?;

        Ok(Self { port })
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Channel for SerialChannel {
    fn send_break(&mut self, duration: std::time::Duration) -> io::Result<()> {
        self.port.set_break()?;
        thread::sleep(duration);
        self.port.clear_break()
    }
}

#[cfg(test)]
mod tests {
    use super::BAUD_RATE;

    #[test]
    fn baud_rate_is_a_standard_value() {
        assert_eq!(BAUD_RATE, 115_200);
    }
}
