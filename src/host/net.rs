//! Socket collaborator (§4.5, §4.6: `SOCKET`, `ACCEPT`, `SET_BLOCK`, `RECV`,
//! `SEND`, `SHUTDOWN`).
//!
//! Sockets do not use [`crate::host::handles::HandleTable`] (§4.5: "sockets
//! are stateless on the host beyond the fd itself"). Rust's standard-library
//! socket types don't let safe code recover a usable object from a bare OS
//! descriptor number on every call without `unsafe` `from_raw_fd` dances that
//! would fight the borrow checker across dispatch calls, so this registry
//! keeps a `HashMap<u16, SocketKind>` keyed by the *real* OS file descriptor
//! (obtained once via `AsRawFd`/`AsRawSocket` at creation time, truncated to
//! `u16` per the wire contract) — the wire-visible "fd" is still the OS
//! descriptor number, satisfying the wire protocol's fd-passthrough
//! contract, while the Rust side owns the socket object safely. Recorded in
//! `DESIGN.md`.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream, UdpSocket};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::io::AsRawFd;
#[cfg(windows)]
use std::os::windows::io::AsRawSocket;

use crate::error::Status;

/// High bit of `SOCKET`'s `proto_mode` argument: set selects BIND, clear
/// selects CONNECT (§4.6).
pub const PROTO_MODE_BIND: u16 = 0x8000;
/// Low bit of `proto_mode`: set selects UDP, clear selects TCP.
pub const PROTO_MODE_UDP: u16 = 0x0001;

/// One live socket, tagged by the object Rust actually needs to drive it.
#[derive(Debug)]
pub enum SocketKind {
    /// A connected or accepted TCP stream.
    TcpStream(TcpStream),
    /// A TCP socket bound and listening.
    TcpListener(TcpListener),
    /// A UDP socket, bound and optionally `connect()`-ed to a peer.
    Udp(UdpSocket),
}

fn raw_fd_of(kind: &SocketKind) -> u16 {
    #[cfg(unix)]
    let raw = match kind {
        SocketKind::TcpStream(s) => s.as_raw_fd(),
        SocketKind::TcpListener(s) => s.as_raw_fd(),
        SocketKind::Udp(s) => s.as_raw_fd(),
    };
    #[cfg(windows)]
    let raw = match kind {
        SocketKind::TcpStream(s) => s.as_raw_socket() as i64,
        SocketKind::TcpListener(s) => s.as_raw_socket() as i64,
        SocketKind::Udp(s) => s.as_raw_socket() as i64,
    };
    raw as u16
}

/// The per-session socket table (§5: "shared resources... mutated only by
/// dispatcher code on the session thread").
#[derive(Debug, Default)]
pub struct SocketRegistry {
    sockets: HashMap<u16, SocketKind>,
}

impl SocketRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { sockets: HashMap::new() }
    }

    fn insert(&mut self, kind: SocketKind) -> u16 {
        let fd = raw_fd_of(&kind);
        self.sockets.insert(fd, kind);
        fd
    }

    /// Resolves `host:port` and opens a TCP/UDP connect-mode or bind-mode
    /// socket per `proto_mode`'s bit layout (§4.6).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if the host/port cannot be resolved or
    /// the socket cannot be created.
    pub fn open(&mut self, host: &str, port: &str, proto_mode: u16) -> Result<u16, Status> {
        let bind = proto_mode & PROTO_MODE_BIND != 0;
        let udp = proto_mode & PROTO_MODE_UDP != 0;
        let addr = format!("{host}:{port}");

        let kind = match (bind, udp) {
            (false, false) => SocketKind::TcpStream(TcpStream::connect(&addr).map_err(|_| Status::BadInput)?),
            (false, true) => {
                let socket = UdpSocket::bind("0.0.0.0:0").map_err(|_| Status::BadInput)?;
                socket.connect(&addr).map_err(|_| Status::BadInput)?;
                SocketKind::Udp(socket)
            }
            (true, false) => SocketKind::TcpListener(TcpListener::bind(&addr).map_err(|_| Status::BadInput)?),
            (true, true) => SocketKind::Udp(UdpSocket::bind(&addr).map_err(|_| Status::BadInput)?),
        };
        Ok(self.insert(kind))
    }

    /// Accepts a connection on `bind_fd` (§4.6: `ACCEPT`).
    ///
    /// For TCP, returns the unchanged `bind_fd`, a fresh `client_fd`, and the
    /// peer's IP address bytes. For UDP, the original `bind_fd` becomes the
    /// connected client socket and a freshly bound socket takes over the
    /// listening role under a new fd (§4.5: "for UDP the bind_fd may
    /// change").
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `bind_fd` is unknown or the accept
    /// fails.
    pub fn accept(&mut self, bind_fd: u16, buf_size: u32) -> Result<(u16, u16, Vec<u8>), Status> {
        let is_udp = matches!(self.sockets.get(&bind_fd).ok_or(Status::BadInput)?, SocketKind::Udp(_));
        let is_listener = matches!(self.sockets.get(&bind_fd).ok_or(Status::BadInput)?, SocketKind::TcpListener(_));

        if is_listener {
            let (stream, addr) = {
                let Some(SocketKind::TcpListener(listener)) = self.sockets.get(&bind_fd) else { unreachable!() };
                listener.accept().map_err(|_| Status::BadInput)?
            };
            let client_fd = self.insert(SocketKind::TcpStream(stream));
            return Ok((bind_fd, client_fd, ip_bytes(addr.ip())));
        }

        if is_udp {
            let cap = (buf_size as usize).clamp(1, 64 * 1024);
            let mut scratch = vec![0u8; cap];
            let (peer, local_addr) = {
                let Some(SocketKind::Udp(socket)) = self.sockets.get(&bind_fd) else { unreachable!() };
                let (_, peer) = socket.peek_from(&mut scratch).map_err(|_| Status::BadInput)?;
                let local_addr = socket.local_addr().map_err(|_| Status::BadInput)?;
                (peer, local_addr)
            };

            let replacement = UdpSocket::bind(local_addr).map_err(|_| Status::BadInput)?;
            let new_bind_fd = self.insert(SocketKind::Udp(replacement));

            let Some(SocketKind::Udp(original)) = self.sockets.get(&bind_fd) else { unreachable!() };
            original.connect(peer).map_err(|_| Status::BadInput)?;

            return Ok((new_bind_fd, bind_fd, ip_bytes(peer.ip())));
        }

        Err(Status::BadInput)
    }

    /// Sets blocking/non-blocking mode on `fd` (§4.6: `SET_BLOCK`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `fd` is unknown or the mode change
    /// fails.
    pub fn set_blocking(&mut self, fd: u16, blocking: bool) -> Result<(), Status> {
        let kind = self.sockets.get(&fd).ok_or(Status::BadInput)?;
        let result = match kind {
            SocketKind::TcpStream(s) => s.set_nonblocking(!blocking),
            SocketKind::TcpListener(s) => s.set_nonblocking(!blocking),
            SocketKind::Udp(s) => s.set_nonblocking(!blocking),
        };
        result.map_err(|_| Status::BadInput)
    }

    /// Reads up to `len` bytes from `fd`, with `timeout` in milliseconds or
    /// [`crate::constants::TIMEOUT_INFINITE`] for a blocking read (§4.6:
    /// `RECV`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `fd` is unknown, is not a stream or
    /// connected datagram socket, or the read fails.
    pub fn recv(&mut self, fd: u16, len: u32, timeout_ms: u32) -> Result<Vec<u8>, Status> {
        use crate::constants::TIMEOUT_INFINITE;

        let timeout = if timeout_ms == TIMEOUT_INFINITE { None } else { Some(Duration::from_millis(u64::from(timeout_ms))) };
        let mut buf = vec![0u8; len as usize];

        let read = match self.sockets.get_mut(&fd).ok_or(Status::BadInput)? {
            SocketKind::TcpStream(s) => {
                s.set_read_timeout(timeout).map_err(|_| Status::BadInput)?;
                s.read(&mut buf).map_err(|_| Status::BadInput)?
            }
            SocketKind::Udp(s) => {
                s.set_read_timeout(timeout).map_err(|_| Status::BadInput)?;
                s.recv(&mut buf).map_err(|_| Status::BadInput)?
            }
            SocketKind::TcpListener(_) => return Err(Status::BadInput),
        };
        buf.truncate(read);
        Ok(buf)
    }

    /// Writes `data` to `fd`, returning the number of bytes sent (§4.6:
    /// `SEND`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `fd` is unknown, is a listener, or the
    /// write fails.
    pub fn send(&mut self, fd: u16, data: &[u8]) -> Result<u32, Status> {
        let written = match self.sockets.get_mut(&fd).ok_or(Status::BadInput)? {
            SocketKind::TcpStream(s) => s.write(data).map_err(|_| Status::BadInput)?,
            SocketKind::Udp(s) => s.send(data).map_err(|_| Status::BadInput)?,
            SocketKind::TcpListener(_) => return Err(Status::BadInput),
        };
        Ok(written as u32)
    }

    /// Releases `fd` (§4.6: `SHUTDOWN`). Always succeeds, matching the
    /// spec's "release socket; always succeeds" — an unknown fd is simply a
    /// no-op.
    pub fn shutdown(&mut self, fd: u16) {
        self.sockets.remove(&fd);
    }
}

fn ip_bytes(ip: IpAddr) -> Vec<u8> {
    match ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tcp_bind_connect_accept_send_recv_round_trips() {
        let mut registry = SocketRegistry::new();
        let bind_fd = registry.open("127.0.0.1", "0", PROTO_MODE_BIND).unwrap();

        let local_port = {
            let SocketKind::TcpListener(listener) = registry.sockets.get(&bind_fd).unwrap() else {
                panic!("expected listener");
            };
            listener.local_addr().unwrap().port()
        };

        let client_fd = registry.open("127.0.0.1", &local_port.to_string(), 0).unwrap();
        let (new_bind_fd, server_fd, ip) = registry.accept(bind_fd, 0).unwrap();
        assert_eq!(new_bind_fd, bind_fd);
        assert_eq!(ip, vec![127, 0, 0, 1]);

        let sent = registry.send(client_fd, b"hello").unwrap();
        assert_eq!(sent, 5);

        let data = registry.recv(server_fd, 5, crate::constants::TIMEOUT_INFINITE).unwrap();
        assert_eq!(data, b"hello");
    }

    #[test]
    fn shutdown_on_unknown_fd_is_a_no_op() {
        let mut registry = SocketRegistry::new();
        registry.shutdown(9999);
    }

    #[test]
    fn recv_on_unknown_fd_is_bad_input() {
        let mut registry = SocketRegistry::new();
        assert_eq!(registry.recv(1, 4, 0), Err(Status::BadInput));
    }
}
