//! `SOCKET`, `ACCEPT`, `SET_BLOCK`, `RECV`, `SEND`, `SHUTDOWN` (§4.6).
//!
//! Each handler validates its inputs with [`Item`]'s accessors and delegates
//! to [`crate::host::net::SocketRegistry`], which owns the actual OS socket
//! objects keyed by their raw descriptor.

use crate::dispatch::DispatchOutcome;
use crate::error::Status;
use crate::protocol::Item;
use crate::session::Session;

/// Wire values for `SET_BLOCK`'s `mode` argument.
pub mod block_mode {
    /// Put the socket in blocking mode.
    pub const BLOCK: u16 = 0;
    /// Put the socket in non-blocking mode.
    pub const NON_BLOCK: u16 = 1;
}

fn as_str(bytes: &[u8]) -> Result<&str, Status> {
    std::str::from_utf8(bytes).map_err(|_| Status::BadInput)
}

/// Arity 3: `host: cstr`, `port: cstr`, `proto_mode: u16`. Output: `fd: u16`.
pub fn socket(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let host = as_str(inputs[0].cstr()?)?;
    let port = as_str(inputs[1].cstr()?)?;
    let proto_mode = inputs[2].u16()?;

    let fd = session.sockets.open(host, port, proto_mode)?;
    let mut out = Item::zeroed(2)?;
    out.set_u16(fd)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 2: `bind_fd: u16`, `buf_size: u32`. Outputs: `bind_fd: u16`,
/// `client_fd: u16`, `ip: blob`.
pub fn accept(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let bind_fd = inputs[0].u16()?;
    let buf_size = inputs[1].u32()?;

    let (new_bind_fd, client_fd, ip) = session.sockets.accept(bind_fd, buf_size)?;

    let mut bind_out = Item::zeroed(2)?;
    bind_out.set_u16(new_bind_fd)?;
    let mut client_out = Item::zeroed(2)?;
    client_out.set_u16(client_fd)?;

    Ok(DispatchOutcome::Reply(vec![bind_out, client_out, Item::from_bytes(ip)]))
}

/// Arity 2: `fd: u16`, `mode: u16`. No outputs.
pub fn set_block(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let fd = inputs[0].u16()?;
    let mode = inputs[1].u16()?;

    let blocking = match mode {
        block_mode::BLOCK => true,
        block_mode::NON_BLOCK => false,
        _ => return Err(Status::BadInput),
    };
    session.sockets.set_blocking(fd, blocking)?;
    Ok(DispatchOutcome::Reply(vec![]))
}

/// Arity 3: `fd: u16`, `len: u32`, `timeout: u32` (milliseconds, or
/// [`crate::constants::TIMEOUT_INFINITE`] for a blocking read). Output:
/// `data: blob`, resized to the bytes actually read.
pub fn recv(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let fd = inputs[0].u16()?;
    let len = inputs[1].u32()?;
    let timeout_ms = inputs[2].u32()?;

    let data = session.sockets.recv(fd, len, timeout_ms)?;
    Ok(DispatchOutcome::Reply(vec![Item::from_bytes(data)]))
}

/// Arity 2: `fd: u16`, `data: blob`. Output: `sent_len: u32`.
pub fn send(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let fd = inputs[0].u16()?;
    let data = inputs[1].as_bytes();

    let sent = session.sockets.send(fd, data)?;
    let mut out = Item::zeroed(4)?;
    out.set_u32(sent)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 1: `fd: u16`. Always succeeds (§4.6: "release socket; always
/// succeeds").
pub fn shutdown(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let fd = inputs[0].u16()?;
    session.sockets.shutdown(fd);
    Ok(DispatchOutcome::Reply(vec![]))
}
