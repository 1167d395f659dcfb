//! `ECHO` (§4.6): returns its single input item unchanged.

use crate::dispatch::DispatchOutcome;
use crate::error::Status;
use crate::protocol::Item;
use crate::session::Session;

/// Arity 1: `blob`. Output: the same blob.
pub fn echo(_session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    Ok(DispatchOutcome::Reply(vec![inputs[0].clone()]))
}
