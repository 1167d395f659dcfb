//! Host-side offloading frontend for an embedded mbed TLS target: a
//! single-session daemon that executes serialized network/filesystem/timing
//! RPCs read off a serial line or pipe (see `SPEC_FULL.md`).

pub mod channel;
pub mod cli;
pub mod constants;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod protocol;
pub mod session;
