//! Binary entry point (§4.8, §4.9, §6).
//!
//! `clap` parses argv, `env_logger` is initialized from an environment
//! variable rather than a fixed level, `mimalloc` is installed as the
//! global allocator, and the process exit code is threaded back out of the
//! daemon's own run loop instead of always returning `0`.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use frontend::channel::{handshake, pipe::PipeChannel, serial::SerialChannel, Channel};
use frontend::cli::Cli;
use frontend::constants::{BOOT_SETTLE_DELAY, BREAK_DURATION};
use frontend::session::Session;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Environment variable gating verbose logging and resync-byte tracing
/// (§6). Unset means `info`-level logging only.
const DEBUG_ENV_VAR: &str = "FRONTEND_DEBUG";

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let debug = std::env::var(DEBUG_ENV_VAR).is_ok();
    let mut channel = open_channel(&cli)?;

    handshake::send_argv(&mut channel, &cli.target_args).context("send argv handshake")?;
    info!("handshake sent, starting session");

    let session = Session::new(channel, debug);
    let exit_code = session.run();

    std::process::exit(exit_code);
}

fn init_logging() {
    let env = env_logger::Env::default().filter_or(DEBUG_ENV_VAR, "info");
    env_logger::Builder::from_env(env).init();
}

fn open_channel(cli: &Cli) -> Result<Box<dyn Channel>> {
    match &cli.port {
        Some(path) => open_serial_channel(path, cli.no_reset),
        None => open_pipe_channel(),
    }
}

fn open_serial_channel(path: &Path, no_reset: bool) -> Result<Box<dyn Channel>> {
    let mut serial = SerialChannel::open(path)?;
    if !no_reset {
        info!("resetting target via BREAK");
        serial.send_break(BREAK_DURATION).context("send BREAK to target")?;
        std::thread::sleep(BOOT_SETTLE_DELAY);
    }
    Ok(Box::new(serial))
}

fn open_pipe_channel() -> Result<Box<dyn Channel>> {
    let (read, write) = stdio_files().context("open stdio as a pipe channel")?;
    Ok(Box::new(PipeChannel::new(read, write)))
}

#[cfg(unix)]
fn stdio_files() -> io::Result<(File, File)> {
    use std::os::fd::FromRawFd;

    // SAFETY: fds 0 and 1 are the process's standard streams, guaranteed
    // open for the lifetime of `main`. Wrapping them in `File` hands the
    // daemon exclusive buffered access; no other code in this process reads
    // or writes stdin/stdout after this point.
    let read = unsafe { File::from_raw_fd(0) };
    let write = unsafe { File::from_raw_fd(1) };
    Ok((read, write))
}

#[cfg(windows)]
fn stdio_files() -> io::Result<(File, File)> {
    let read = std::fs::OpenOptions::new().read(true).open("CONIN$")?;
    let write = std::fs::OpenOptions::new().write(true).open("CONOUT$")?;
    Ok((read, write))
}
