//! Command-line surface (§4.8, §4.9, §6).
//!
//! Grounded on the teacher's `main.rs` argument parsing: a `clap` derive
//! struct with `#[command(author, version, about)]`, kept intentionally thin
//! since almost everything this daemon does is driven by the wire protocol,
//! not flags.

use std::path::PathBuf;

use clap::Parser;

/// Host-side offloading daemon for an embedded mbed TLS target.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Serial device to open (e.g. `/dev/ttyACM0`, `COM3`). When omitted, the
    /// daemon communicates over stdin/stdout as a pipe (§4.8).
    #[arg(long, value_name = "DEVICE")]
    pub port: Option<PathBuf>,

    /// Skip the BREAK-and-settle reset sequence before the session starts
    /// (§4.8). Has no effect in pipe mode.
    #[arg(long)]
    pub no_reset: bool,

    /// Arguments to forward to the target over the handshake channel before
    /// the session begins (§4.9).
    #[arg(trailing_var_arg = true)]
    pub target_args: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_port_and_trailing_target_args() {
        let cli = Cli::parse_from(["frontend", "--port", "/dev/ttyACM0", "--", "a.out", "--flag"]);
        assert_eq!(cli.port, Some(PathBuf::from("/dev/ttyACM0")));
        assert_eq!(cli.target_args, vec!["a.out", "--flag"]);
    }

    #[test]
    fn defaults_to_pipe_mode_with_no_port() {
        let cli = Cli::parse_from(["frontend"]);
        assert_eq!(cli.port, None);
        assert!(!cli.no_reset);
    }
}
