//! `DOPEN`, `DREAD`, `DCLOSE`, `STAT` (§4.6). Mirrors `file_ops`'s shape for
//! the directory-stream handlers; `STAT` needs no handle at all.

use std::path::Path;

use crate::dispatch::DispatchOutcome;
use crate::error::Status;
use crate::protocol::Item;
use crate::session::Session;

fn as_str(bytes: &[u8]) -> Result<&str, Status> {
    std::str::from_utf8(bytes).map_err(|_| Status::BadInput)
}

/// Arity 1: `path: cstr`. Output: `dir_id: u32`.
pub fn dopen(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let path = as_str(inputs[0].cstr()?)?;

    if !session.dirs.has_capacity() {
        return Err(Status::BadOutput);
    }
    let handle = crate::host::dir::open(Path::new(path))?;
    let id = session.dirs.alloc(handle).expect("capacity was checked above");

    let mut out = Item::zeroed(4)?;
    out.set_u32(id)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 2: `size: u32`, `dir_id: u32`. Output: `name: blob` (empty
/// NUL-terminated string at end-of-directory).
pub fn dread(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let size = inputs[0].u32()? as usize;
    let dir_id = inputs[1].u32()?;

    let handle = session.dirs.lookup_mut(dir_id)?;
    let name = handle.read(size)?;
    Ok(DispatchOutcome::Reply(vec![Item::from_bytes(name)]))
}

/// Arity 1: `dir_id: u32`. No outputs.
pub fn dclose(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let dir_id = inputs[0].u32()?;
    session.dirs.release(dir_id)?;
    Ok(DispatchOutcome::Reply(vec![]))
}

/// Arity 1: `path: cstr`. Output: `file_type: u16`.
pub fn stat(_session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let path = as_str(inputs[0].cstr()?)?;
    let file_type = crate::host::dir::stat(Path::new(path))?;

    let mut out = Item::zeroed(2)?;
    out.set_u16(file_type)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}
