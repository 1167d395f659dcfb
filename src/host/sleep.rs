//! Sleep collaborator (§4.6: `USLEEP`).

use std::thread;
use std::time::Duration;

/// Blocks the calling thread for `usec` microseconds.
pub fn usleep(usec: u32) {
    thread::sleep(Duration::from_micros(u64::from(usec)));
}
