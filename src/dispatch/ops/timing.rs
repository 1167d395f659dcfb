//! `EXIT` and `USLEEP` (§4.6).

use crate::dispatch::DispatchOutcome;
use crate::error::Status;
use crate::host;
use crate::protocol::Item;
use crate::session::Session;

/// Arity 1: `code: u32`. Requests session termination; the session layer
/// reads [`DispatchOutcome::Exit`] and emits no reply (§4.6, §4.7).
pub fn exit(_session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let code = inputs[0].u32()?;
    Ok(DispatchOutcome::Exit(code as i32))
}

/// Arity 1: `usec: u32`. Blocks the session thread for `usec` microseconds.
pub fn usleep(_session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let usec = inputs[0].u32()?;
    host::sleep::usleep(usec);
    Ok(DispatchOutcome::Reply(vec![]))
}
