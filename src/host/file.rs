//! File collaborator (§4.6: `FOPEN`, `FREAD`, `FGETS`, `FWRITE`, `FCLOSE`,
//! `FSEEK`, `FTELL`, `FERROR`).
//!
//! Wraps `std::fs::File` together with a sticky error flag, mirroring
//! stdio's `ferror()` semantics (§4.6: "Returns host ferror as the status
//! word") which `std::fs::File` has no native equivalent for — the flag is
//! set whenever a read/write/seek collaborator call fails and is read back
//! verbatim by `FERROR` (§7: "collaborator status codes are forwarded
//! verbatim... the dispatcher does not translate them").

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Status;

/// A host-side open file plus its sticky error flag.
#[derive(Debug)]
pub struct FileHandle {
    file: File,
    had_error: bool,
}

/// Protocol `whence` constants for `FSEEK` (standard C stdio numbering).
pub mod whence {
    /// Seek from the start of the file.
    pub const SET: u32 = 0;
    /// Seek from the current position.
    pub const CUR: u32 = 1;
    /// Seek from the end of the file.
    pub const END: u32 = 2;
}

/// Translates an fopen-style mode string (`"r"`, `"w"`, `"a"`, `"r+"`, `"w+"`,
/// `"a+"`) into `OpenOptions`.
///
/// # Errors
///
/// Returns [`Status::BadOutput`] if `mode` is not one of the recognized
/// forms (§4.6: the `FOPEN` family presets its status to `BAD_OUTPUT` and
/// only clears it on success).
fn open_options(mode: &str) -> Result<OpenOptions, Status> {
    let mut options = OpenOptions::new();
    match mode {
        "r" => {
            options.read(true);
        }
        "r+" => {
            options.read(true).write(true);
        }
        "w" => {
            options.write(true).create(true).truncate(true);
        }
        "w+" => {
            options.read(true).write(true).create(true).truncate(true);
        }
        "a" => {
            options.write(true).create(true).append(true);
        }
        "a+" => {
            options.read(true).write(true).create(true).append(true);
        }
        _ => return Err(Status::BadOutput),
    }
    Ok(options)
}

/// Opens `path` per `mode` (§4.6: `FOPEN`).
///
/// # Errors
///
/// Returns [`Status::BadOutput`] if `mode` is unrecognized or the host
/// `open()` call fails.
pub fn open(path: &Path, mode: &str) -> Result<FileHandle, Status> {
    let file = open_options(mode)?.open(path).map_err(|_| Status::BadOutput)?;
    Ok(FileHandle { file, had_error: false })
}

impl FileHandle {
    /// Reads up to `size` bytes (§4.6: `FREAD`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadOutput`] on a host read error; also flags
    /// `had_error`.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>, Status> {
        let mut buf = vec![0u8; size];
        let read = match self.file.read(&mut buf) {
            Ok(n) => n,
            Err(_) => {
                self.had_error = true;
                return Err(Status::BadOutput);
            }
        };
        buf.truncate(read);
        Ok(buf)
    }

    /// Reads a single line of up to `size - 1` bytes, keeping the trailing
    /// newline if one was read, and NUL-terminating the result (§4.6:
    /// `FGETS`, "resized to strlen+1").
    ///
    /// Reads one byte at a time directly off `self.file` rather than through
    /// a `BufReader`: a fresh `BufReader` built on every call would pull
    /// ahead into the OS file and then discard whatever it buffered but
    /// didn't consume when it's dropped at the end of the function, leaving
    /// the next `FGETS`/`FREAD` resuming at the wrong offset.
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `size` is zero, or [`Status::BadOutput`]
    /// on a host read error.
    pub fn read_line(&mut self, size: usize) -> Result<Vec<u8>, Status> {
        if size == 0 {
            return Err(Status::BadInput);
        }
        let cap = size - 1;
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        while line.len() < cap {
            match self.file.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    line.push(byte[0]);
                    if byte[0] == b'\n' {
                        break;
                    }
                }
                Err(_) => {
                    self.had_error = true;
                    return Err(Status::BadOutput);
                }
            }
        }

        line.push(0);
        Ok(line)
    }

    /// Writes `data` (§4.6: `FWRITE`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadOutput`] on a host write error; also flags
    /// `had_error`.
    pub fn write(&mut self, data: &[u8]) -> Result<u32, Status> {
        match self.file.write(data) {
            Ok(n) => Ok(n as u32),
            Err(_) => {
                self.had_error = true;
                Err(Status::BadOutput)
            }
        }
    }

    /// Seeks per `whence` (§4.6: `FSEEK`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadOutput`] for an unrecognized `whence` value
    /// (§4.6: "any other value fails `BAD_OUTPUT`"), or on a host seek
    /// error.
    pub fn seek(&mut self, offset: i32, whence_value: u32) -> Result<(), Status> {
        let from = match whence_value {
            whence::SET => SeekFrom::Start(offset.max(0) as u64),
            whence::CUR => SeekFrom::Current(i64::from(offset)),
            whence::END => SeekFrom::End(i64::from(offset)),
            _ => return Err(Status::BadOutput),
        };
        self.file.seek(from).map(|_| ()).map_err(|_| {
            self.had_error = true;
            Status::BadOutput
        })
    }

    /// Returns the current stream position (§4.6: `FTELL`).
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadOutput`] on a host error.
    pub fn tell(&mut self) -> Result<u32, Status> {
        self.file.stream_position().map(|pos| pos as u32).map_err(|_| Status::BadOutput)
    }

    /// Returns the sticky error flag as a wire status word (§4.6: `FERROR`).
    /// Unlike every other dispatch handler, this value is *data*, not a
    /// failure outcome — `0` means no error has been observed.
    #[must_use]
    pub fn had_error(&self) -> bool {
        self.had_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn open_options_reject_unknown_mode() {
        assert!(open_options("x").is_err());
    }

    #[test]
    fn write_then_read_round_trips_through_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");

        let mut handle = open(&path, "w").unwrap();
        assert_eq!(handle.write(b"abc").unwrap(), 3);
        drop(handle);

        let mut handle = open(&path, "r").unwrap();
        let data = handle.read(8).unwrap();
        assert_eq!(data, b"abc");
    }

    #[test]
    fn fgets_stops_at_newline_and_nul_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        std::fs::File::create(&path).unwrap().write_all(b"first\nsecond\n").unwrap();

        let mut handle = open(&path, "r").unwrap();
        let line = handle.read_line(64).unwrap();
        assert_eq!(line, b"first\n\0".to_vec());
    }

    #[test]
    fn fgets_sequential_calls_stay_aligned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lines.txt");
        std::fs::File::create(&path).unwrap().write_all(b"first\nsecond\nthird").unwrap();

        let mut handle = open(&path, "r").unwrap();
        assert_eq!(handle.read_line(64).unwrap(), b"first\n\0".to_vec());
        assert_eq!(handle.read_line(64).unwrap(), b"second\n\0".to_vec());

        let rest = handle.read(16).unwrap();
        assert_eq!(rest, b"third");
    }

    #[test]
    fn fseek_rejects_unknown_whence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        std::fs::File::create(&path).unwrap();
        let mut handle = open(&path, "r").unwrap();
        assert_eq!(handle.seek(0, 99), Err(Status::BadOutput));
    }

    #[test]
    fn ferror_starts_clear() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x");
        std::fs::File::create(&path).unwrap();
        let handle = open(&path, "r").unwrap();
        assert!(!handle.had_error());
    }
}
