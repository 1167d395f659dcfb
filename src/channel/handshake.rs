//! Argv forwarding (§4.9): independent of the frame codec, written once at
//! session start.
//!
//! Per §9's open question, `send_args` in the source ignores the return
//! value of its writes; this reimplementation does not repeat that bug
//! (`send_argv` below propagates `io::Error` via `anyhow`), but it also does
//! not invent an acknowledgement the spec never defines — see `DESIGN.md`.

use std::io::Write;

use anyhow::{Context, Result};

use crate::constants::HANDSHAKE;

/// Sends the `mbed{{` handshake followed by the argv byte count and, if
/// non-zero, the concatenated NUL-terminated argv strings.
///
/// # Errors
///
/// Returns an error if any write to `channel` fails.
pub fn send_argv(channel: &mut impl Write, argv: &[String]) -> Result<()> {
    channel.write_all(HANDSHAKE).context("write handshake sentinel")?;

    let mut payload = Vec::new();
    for arg in argv {
        payload.extend_from_slice(arg.as_bytes());
        payload.push(0);
    }

    let len = u32::try_from(payload.len()).context("argv payload exceeds u32 range")?;
    channel.write_all(&len.to_be_bytes()).context("write argv byte count")?;
    if !payload.is_empty() {
        channel.write_all(&payload).context("write argv payload")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_argv_sends_handshake_and_zero_count() {
        let mut buf = Vec::new();
        send_argv(&mut buf, &[]).unwrap();
        assert_eq!(buf, b"mbed{{\x00\x00\x00\x00".to_vec());
    }

    #[test]
    fn nonempty_argv_is_nul_terminated_and_concatenated() {
        let mut buf = Vec::new();
        send_argv(&mut buf, &["--port".to_string(), "/dev/ttyACM0".to_string()]).unwrap();

        let mut expected = b"mbed{{".to_vec();
        let payload_len = "--port".len() + 1 + "/dev/ttyACM0".len() + 1;
        expected.extend_from_slice(&(payload_len as u32).to_be_bytes());
        expected.extend_from_slice(b"--port\0/dev/ttyACM0\0");
        assert_eq!(buf, expected);
    }
}
