//! Dispatcher (§4.6): one entry per opcode, validating arity and argument
//! shape before calling into a collaborator.
//!
//! Grounded on the teacher's `hub/actions/` directory: a `mod.rs` holding the
//! table of dispatchable operations and the central `dispatch()` match, with
//! one handler submodule per family (`ops::echo`, `ops::socket_ops`,
//! `ops::file_ops`, `ops::dir_ops`, `ops::timing`) — the same "mod.rs routes,
//! handler modules implement" split as `hub/actions/mod.rs` routing to
//! `agent_handlers`/`connection_handlers`.
//!
//! **Opcode numbering.** The header defining the real opcode constants
//! (`mbedtls/serialize.h`) is not part of the retrieved source fragment, so
//! exact numeric values are implementation-defined. This module assigns one
//! 24-bit constant per opcode such that the low byte is `(arity << 4) |
//! sequence_id`, satisfying the arity-nibble invariant for every opcode, and
//! reproduces the one concrete value the spec's worked example names (`ECHO
//! = 0x000210`, arity 1). The full table is recorded in `DESIGN.md`.

pub mod ops;

use crate::protocol::Item;
use crate::error::Status;
use crate::session::Session;

/// What a successful dispatch produced.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Normal success: zero or more output items, status word `0`.
    Reply(Vec<Item>),
    /// The target requested termination (`EXIT`); no reply is emitted and
    /// the session transitions to `EXITED` (§4.6, §4.7).
    Exit(i32),
}

type Handler = fn(&mut Session, &[Item]) -> Result<DispatchOutcome, Status>;

struct OpcodeSpec {
    opcode: u32,
    arity: usize,
    handler: Handler,
}

macro_rules! opcode_table {
    ($(($name:ident, $arity:literal, $seq:literal, $handler:expr)),* $(,)?) => {
        &[$(
            OpcodeSpec {
                opcode: 0x0002_00 | (($arity as u32) << 4 | $seq as u32),
                arity: $arity,
                handler: $handler,
            },
        )*]
    };
}

// Arity-1 group: low byte = 0x10 | seq. ECHO gets seq 0 so its opcode
// reproduces the worked example in §8 (`ECHO = 0x000210`).
const ARITY_1: &[OpcodeSpec] = opcode_table![
    (Echo, 1, 0, ops::echo::echo),
    (Exit, 1, 1, ops::timing::exit),
    (Usleep, 1, 2, ops::timing::usleep),
    (Shutdown, 1, 3, ops::socket_ops::shutdown),
    (Fclose, 1, 4, ops::file_ops::fclose),
    (Ftell, 1, 5, ops::file_ops::ftell),
    (Ferror, 1, 6, ops::file_ops::ferror),
    (Dopen, 1, 7, ops::dir_ops::dopen),
    (Dclose, 1, 8, ops::dir_ops::dclose),
    (Stat, 1, 9, ops::dir_ops::stat),
];

// Arity-2 group: low byte = 0x20 | seq.
const ARITY_2: &[OpcodeSpec] = opcode_table![
    (Accept, 2, 0, ops::socket_ops::accept),
    (SetBlock, 2, 1, ops::socket_ops::set_block),
    (Send, 2, 2, ops::socket_ops::send),
    (Fopen, 2, 3, ops::file_ops::fopen),
    (Fread, 2, 4, ops::file_ops::fread),
    (Fgets, 2, 5, ops::file_ops::fgets),
    (Fwrite, 2, 6, ops::file_ops::fwrite),
    (Dread, 2, 7, ops::dir_ops::dread),
];

// Arity-3 group: low byte = 0x30 | seq.
const ARITY_3: &[OpcodeSpec] = opcode_table![
    (Socket, 3, 0, ops::socket_ops::socket),
    (Recv, 3, 1, ops::socket_ops::recv),
    (Fseek, 3, 2, ops::file_ops::fseek),
];

fn find_opcode(opcode: u32) -> Option<&'static OpcodeSpec> {
    ARITY_1.iter().chain(ARITY_2).chain(ARITY_3).find(|spec| spec.opcode == opcode)
}

/// Dispatches one `EXECUTE` opcode against the session's argument stack and
/// collaborators.
///
/// Per §4.6: the opcode is looked up, its declared arity pre-binds that many
/// items off the top of the stack (failing `BAD_INPUT` if too few are
/// present), and the handler is called with that slice. Outputs not yet
/// fully built on a handler failure are simply dropped — `Vec`/`Item`
/// ownership makes the "free any already-allocated outputs" step in §4.6
/// step 3 automatic.
///
/// # Errors
///
/// Returns the handler's [`Status`] on validation or collaborator failure,
/// or [`Status::BadInput`] for an opcode not present in the table (§4.6:
/// "unknown opcode: fails `BAD_INPUT`").
pub fn dispatch(session: &mut Session, opcode: u32) -> Result<DispatchOutcome, Status> {
    let spec = find_opcode(opcode).ok_or(Status::BadInput)?;

    // Cross-check the arity nibble against the table (§9: "the arity nibble
    // is a cross-check, not the source of truth").
    if crate::constants::opcode_arity(opcode) as usize != spec.arity {
        return Err(Status::BadInput);
    }

    let inputs: Vec<Item> = session.stack.iterate(spec.arity)?.into_iter().cloned().collect();
    (spec.handler)(session, &inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_opcode_matches_worked_example() {
        let spec = find_opcode(0x0002_10).expect("ECHO must be registered");
        assert_eq!(spec.arity, 1);
    }

    #[test]
    fn unknown_opcode_is_none() {
        assert!(find_opcode(0x00FF_FF).is_none());
    }

    #[test]
    fn every_table_entry_is_internally_consistent() {
        for spec in ARITY_1.iter().chain(ARITY_2).chain(ARITY_3) {
            assert_eq!(crate::constants::opcode_arity(spec.opcode) as usize, spec.arity);
        }
    }
}
