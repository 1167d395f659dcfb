//! `FOPEN`, `FREAD`, `FGETS`, `FWRITE`, `FCLOSE`, `FSEEK`, `FTELL`, `FERROR`
//! (§4.6).

use std::path::Path;

use crate::dispatch::DispatchOutcome;
use crate::error::Status;
use crate::protocol::Item;
use crate::session::Session;

fn as_str(bytes: &[u8]) -> Result<&str, Status> {
    std::str::from_utf8(bytes).map_err(|_| Status::BadInput)
}

/// Arity 2: `mode: cstr`, `path: cstr`. Output: `file_id: u32`.
///
/// Rejects the call with `BAD_OUTPUT` before touching the host filesystem if
/// the file table is already full, the closest safe equivalent of "allocates
/// handle before opening" (§4.6, `DESIGN.md`).
pub fn fopen(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let mode = as_str(inputs[0].cstr()?)?;
    let path = as_str(inputs[1].cstr()?)?;

    if !session.files.has_capacity() {
        return Err(Status::BadOutput);
    }
    let handle = crate::host::file::open(Path::new(path), mode)?;
    let id = session.files.alloc(handle).expect("capacity was checked above");

    let mut out = Item::zeroed(4)?;
    out.set_u32(id)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 2: `size: u32`, `file_id: u32`. Output: `data: blob`.
pub fn fread(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let size = inputs[0].u32()? as usize;
    let file_id = inputs[1].u32()?;

    let handle = session.files.lookup_mut(file_id)?;
    let data = handle.read(size)?;
    Ok(DispatchOutcome::Reply(vec![Item::from_bytes(data)]))
}

/// Arity 2: `size: u32`, `file_id: u32`. Output: `line: blob` (NUL-terminated).
pub fn fgets(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let size = inputs[0].u32()? as usize;
    let file_id = inputs[1].u32()?;

    let handle = session.files.lookup_mut(file_id)?;
    let line = handle.read_line(size)?;
    Ok(DispatchOutcome::Reply(vec![Item::from_bytes(line)]))
}

/// Arity 2: `data: blob`, `file_id: u32`. Output: `written_len: u32`.
pub fn fwrite(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let data = inputs[0].as_bytes();
    let file_id = inputs[1].u32()?;

    let handle = session.files.lookup_mut(file_id)?;
    let written = handle.write(data)?;

    let mut out = Item::zeroed(4)?;
    out.set_u32(written)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 1: `file_id: u32`. No outputs; dropping the released [`crate::host::file::FileHandle`]
/// closes the underlying file.
pub fn fclose(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let file_id = inputs[0].u32()?;
    session.files.release(file_id)?;
    Ok(DispatchOutcome::Reply(vec![]))
}

/// Arity 3: `offset: i32`, `whence: u32`, `file_id: u32`. No outputs.
pub fn fseek(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let offset = inputs[0].i32()?;
    let whence_value = inputs[1].u32()?;
    let file_id = inputs[2].u32()?;

    let handle = session.files.lookup_mut(file_id)?;
    handle.seek(offset, whence_value)?;
    Ok(DispatchOutcome::Reply(vec![]))
}

/// Arity 1: `file_id: u32`. Output: `position: u32`.
pub fn ftell(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let file_id = inputs[0].u32()?;
    let handle = session.files.lookup_mut(file_id)?;
    let position = handle.tell()?;

    let mut out = Item::zeroed(4)?;
    out.set_u32(position)?;
    Ok(DispatchOutcome::Reply(vec![out]))
}

/// Arity 1: `file_id: u32`. The status word itself carries the sticky
/// error flag — unlike every other opcode, a nonzero value here is data, not
/// a dispatch failure the caller should retry from (§4.6: "Returns host
/// ferror as the status word"). There is no dedicated wire status for an
/// arbitrary host errno, so a set flag is reported via `Status::BadOutput`,
/// matching the rest of the file/dir family's preset-and-clear status
/// convention (`DESIGN.md`).
pub fn ferror(session: &mut Session, inputs: &[Item]) -> Result<DispatchOutcome, Status> {
    let file_id = inputs[0].u32()?;
    let handle = session.files.lookup_mut(file_id)?;
    if handle.had_error() {
        return Err(Status::BadOutput);
    }
    Ok(DispatchOutcome::Reply(vec![]))
}
