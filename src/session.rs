//! Session state machine and pull loop (§4.7).
//!
//! One owned collaborator set (the argument stack plus the host tables)
//! driven by a blocking read loop over a single `Channel`. This crate's
//! concurrency model is one session per process (§5), so there is exactly
//! one of these and the loop is plain blocking `std::io`, not an async
//! runtime.

use log::{debug, trace, warn};

use crate::channel::{self, Channel};
use crate::constants::{FRAME_HEADER_LEN, HANDLE_TABLE_CAPACITY, MAX_STRING_LENGTH};
use crate::dispatch::{self, DispatchOutcome};
use crate::error::Status;
use crate::host::dir::DirHandle;
use crate::host::file::FileHandle;
use crate::host::{HandleTable, SocketRegistry};
use crate::protocol::{Frame, FrameDecoder, HeaderKind, Item};

/// The session's current state (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Normal operation.
    Ok,
    /// A `PUSH` failed to allocate; payload bytes are drained and discarded
    /// until the next `EXECUTE`.
    OutOfMemory,
    /// The channel is damaged (a read or write failed); the pull loop stops.
    Dead,
    /// The target issued `EXIT`; the pull loop stops, no reply is sent.
    Exited,
}

/// One offloading session: the argument stack, the host-side resource
/// tables, and the channel to the embedded target.
pub struct Session {
    channel: Box<dyn Channel>,
    pub(crate) stack: crate::protocol::ArgStack,
    state: SessionState,
    pub(crate) files: HandleTable<FileHandle>,
    pub(crate) dirs: HandleTable<DirHandle>,
    pub(crate) sockets: SocketRegistry,
    exit_code: i32,
    debug: bool,
}

impl Session {
    /// Creates a session over `channel`. `debug` forwards discarded
    /// resynchronization bytes to the trace log (§4.1, §6).
    #[must_use]
    pub fn new(channel: Box<dyn Channel>, debug: bool) -> Self {
        Self {
            channel,
            stack: crate::protocol::ArgStack::new(),
            state: SessionState::Ok,
            files: HandleTable::with_capacity(HANDLE_TABLE_CAPACITY),
            dirs: HandleTable::with_capacity(HANDLE_TABLE_CAPACITY),
            sockets: SocketRegistry::new(),
            exit_code: 0,
            debug,
        }
    }

    /// Runs the session to completion: resynchronizes once, then pulls
    /// frames until the channel dies or the target exits (§4.1, §4.7).
    ///
    /// Returns the process exit code: the `EXIT` opcode's argument on a
    /// clean exit, or the last status code observed before the channel died
    /// (§6).
    pub fn run(mut self) -> i32 {
        let debug = self.debug;
        if channel::resync(&mut *self.channel, |b| {
            if debug {
                trace!("resync: discarding 0x{b:02x}");
            }
        })
        .is_err()
        {
            warn!("channel failed during startup resynchronization");
            return self.exit_code;
        }
        debug!("resynchronized, entering pull loop");

        while !matches!(self.state, SessionState::Dead | SessionState::Exited) {
            self.pull();
        }
        self.exit_code
    }

    fn pull(&mut self) {
        let header = match channel::read_exact(&mut *self.channel, FRAME_HEADER_LEN) {
            Ok(bytes) => bytes,
            Err(_) => {
                self.state = SessionState::Dead;
                return;
            }
        };
        let header: [u8; FRAME_HEADER_LEN] = header.try_into().expect("read_exact returns exactly the requested length");

        let kind = match FrameDecoder::decode_header(header) {
            Ok(kind) => kind,
            Err(err) => {
                warn!("malformed frame header: {err}");
                self.state = SessionState::Dead;
                return;
            }
        };

        match kind {
            HeaderKind::Push { len } => self.handle_push(len as usize),
            HeaderKind::Execute { opcode } => self.handle_execute(opcode),
            // RESULT only ever flows target-ward; receiving one here means
            // the channel has desynchronized beyond the resync sentinel's
            // reach.
            HeaderKind::Result { .. } => {
                warn!("received an inbound RESULT frame, treating as desync");
                self.state = SessionState::Dead;
            }
        }
    }

    fn handle_push(&mut self, len: usize) {
        if matches!(self.state, SessionState::OutOfMemory) {
            self.drain(len);
            return;
        }

        match Item::zeroed(len) {
            Ok(mut item) => match self.channel.read_exact(item.as_bytes_mut()) {
                Ok(()) => self.stack.push(item),
                Err(_) => self.state = SessionState::Dead,
            },
            Err(Status::AllocFailed) => {
                self.drain(len);
                self.state = SessionState::OutOfMemory;
            }
            Err(_) => unreachable!("Item::zeroed only returns AllocFailed"),
        }
    }

    /// Reads and discards `len` bytes in bounded chunks, so draining a
    /// payload whose allocation we just refused doesn't itself require a
    /// `len`-sized allocation (§4.7: "leaves the reader aligned on the next
    /// frame boundary").
    fn drain(&mut self, mut len: usize) {
        let mut scratch = [0u8; 4096];
        while len > 0 {
            let chunk = len.min(scratch.len());
            if self.channel.read_exact(&mut scratch[..chunk]).is_err() {
                self.state = SessionState::Dead;
                return;
            }
            len -= chunk;
        }
    }

    fn handle_execute(&mut self, opcode: u32) {
        if matches!(self.state, SessionState::OutOfMemory) {
            self.stack.discard_all();
            self.state = SessionState::Ok;
            if self.emit_status(Status::AllocFailed).is_err() {
                self.state = SessionState::Dead;
            }
            return;
        }

        let outcome = dispatch::dispatch(self, opcode);
        self.stack.discard_all();

        match outcome {
            Ok(DispatchOutcome::Exit(code)) => {
                self.exit_code = code;
                self.state = SessionState::Exited;
            }
            Ok(DispatchOutcome::Reply(outputs)) => {
                if self.emit_reply(outputs).is_err() {
                    self.state = SessionState::Dead;
                }
            }
            Err(status) => {
                if self.emit_status(status).is_err() {
                    self.state = SessionState::Dead;
                }
            }
        }
    }

    fn write_frame(&mut self, frame: Frame) -> Result<(), Status> {
        let bytes = frame.encode().map_err(|_| Status::UnsupportedOutput)?;
        channel::write_all(&mut *self.channel, &bytes)
    }

    fn emit_status(&mut self, status: Status) -> Result<(), Status> {
        self.exit_code = status as i32;
        self.write_frame(Frame::Result(Item::from_bytes(status.to_be_bytes().to_vec())))
    }

    /// Writes the success status word `0` followed by every output item, or
    /// falls back to `UNSUPPORTED_OUTPUT` if any output exceeds
    /// `MAX_STRING_LENGTH` (§4.2, §4.6 step 5).
    fn emit_reply(&mut self, outputs: Vec<Item>) -> Result<(), Status> {
        if outputs.iter().any(|item| item.len() > MAX_STRING_LENGTH) {
            return self.emit_status(Status::UnsupportedOutput);
        }

        self.exit_code = 0;
        self.write_frame(Frame::Result(Item::from_bytes(0u32.to_be_bytes().to_vec())))?;
        for item in outputs {
            self.write_frame(Frame::Result(item))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    struct LoopChannel {
        input: Cursor<Vec<u8>>,
        written: Rc<RefCell<Vec<u8>>>,
    }

    impl std::io::Read for LoopChannel {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }
    impl std::io::Write for LoopChannel {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
    impl Channel for LoopChannel {}

    fn session_with_output(input: Vec<u8>) -> (Session, Rc<RefCell<Vec<u8>>>) {
        let written = Rc::new(RefCell::new(Vec::new()));
        let channel = LoopChannel { input: Cursor::new(input), written: written.clone() };
        (Session::new(Box::new(channel), false), written)
    }

    #[test]
    fn out_of_memory_state_drains_pushes_until_next_execute() {
        let (mut session, _) = session_with_output(Vec::new());
        session.state = SessionState::OutOfMemory;
        session.stack.push(Item::from_bytes(vec![1, 2, 3]));

        session.handle_execute(0x00FF_FF);
        assert_eq!(session.state, SessionState::Ok);
        assert!(session.stack.is_empty());
    }

    #[test]
    fn exit_opcode_transitions_to_exited_with_its_code() {
        let (mut session, written) = session_with_output(Vec::new());
        session.stack.push(Item::from_bytes(7u32.to_be_bytes().to_vec()));

        session.handle_execute(0x0002_11); // EXIT
        assert_eq!(session.state, SessionState::Exited);
        assert_eq!(session.exit_code, 7);
        assert!(written.borrow().is_empty(), "EXIT must not emit a reply frame");
    }

    #[test]
    fn unknown_opcode_emits_bad_input_status_frame() {
        let (mut session, written) = session_with_output(Vec::new());

        session.handle_execute(0x00FF_FF);
        assert_eq!(session.state, SessionState::Ok);
        assert_eq!(*written.borrow(), vec![0x72, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn echo_dispatch_replies_with_status_zero_then_the_blob() {
        let (mut session, written) = session_with_output(Vec::new());
        session.stack.push(Item::from_bytes(b"hi".to_vec()));

        session.handle_execute(0x0002_10); // ECHO
        assert_eq!(session.state, SessionState::Ok);

        let mut expected = vec![0x72, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x00];
        expected.extend(Frame::Result(Item::from_bytes(b"hi".to_vec())).encode().unwrap());
        assert_eq!(*written.borrow(), expected);
    }

    #[test]
    fn pull_reads_a_push_then_an_execute_from_the_channel() {
        let mut input = Frame::Push(Item::from_bytes(b"hi".to_vec())).encode().unwrap();
        input.extend(Frame::Execute(0x0002_10).encode().unwrap()); // ECHO

        let (mut session, written) = session_with_output(input);
        session.pull();
        assert_eq!(session.stack.len(), 1);

        session.pull();
        assert_eq!(session.state, SessionState::Ok);
        assert!(!written.borrow().is_empty());
    }
}
