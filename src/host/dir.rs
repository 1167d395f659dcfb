//! Directory collaborator (§4.6: `DOPEN`, `DREAD`, `DCLOSE`, `STAT`).
//!
//! `DOPEN`/`DCLOSE` mirror `FOPEN`/`FCLOSE` (§4.6: "Mirrors FOPEN"); `DREAD`
//! advances a `std::fs::ReadDir` iterator one entry at a time, matching the
//! wire contract of one `readdir()` call per `DREAD` frame.

use std::fs::ReadDir;
use std::path::Path;

use crate::error::Status;

/// A host-side open directory stream.
#[derive(Debug)]
pub struct DirHandle {
    entries: ReadDir,
}

/// `STAT`'s wire-visible file-type codes (§4.6: `STAT`).
pub mod file_type {
    /// A regular file.
    pub const REGULAR: u16 = 0;
    /// A directory.
    pub const DIRECTORY: u16 = 1;
    /// Anything else the host filesystem reports (symlink, device, etc.).
    pub const OTHER: u16 = 2;
}

/// Opens `path` for directory enumeration (§4.6: `DOPEN`).
///
/// # Errors
///
/// Returns [`Status::BadOutput`] if `path` cannot be opened as a directory
/// (§4.6: the `DOPEN`/`DREAD`/`DCLOSE`/`STAT` family presets its status to
/// `BAD_OUTPUT` and only clears it on success; `BAD_INPUT` is reserved for
/// arity/length violations).
pub fn open(path: &Path) -> Result<DirHandle, Status> {
    let entries = std::fs::read_dir(path).map_err(|_| Status::BadOutput)?;
    Ok(DirHandle { entries })
}

impl DirHandle {
    /// Reads the next directory entry's name, truncated to `size - 1` bytes
    /// and NUL-terminated, or an empty NUL-terminated string at end of
    /// directory (§4.6: `DREAD`, "returns empty string at end-of-directory
    /// (status 0)").
    ///
    /// # Errors
    ///
    /// Returns [`Status::BadInput`] if `size` is zero, or
    /// [`Status::BadOutput`] if the underlying `readdir()` call fails.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>, Status> {
        if size == 0 {
            return Err(Status::BadInput);
        }
        let Some(entry) = self.entries.next() else {
            return Ok(vec![0]);
        };
        let entry = entry.map_err(|_| Status::BadOutput)?;
        let name = entry.file_name();
        let mut bytes = name.to_string_lossy().into_owned().into_bytes();
        bytes.truncate(size - 1);
        bytes.push(0);
        Ok(bytes)
    }
}

/// Classifies `path`'s file type (§4.6: `STAT`).
///
/// # Errors
///
/// Returns [`Status::BadOutput`] if `path` cannot be `stat`-ed (e.g. it does
/// not exist).
pub fn stat(path: &Path) -> Result<u16, Status> {
    let metadata = std::fs::symlink_metadata(path).map_err(|_| Status::BadOutput)?;
    if metadata.is_dir() {
        Ok(file_type::DIRECTORY)
    } else if metadata.is_file() {
        Ok(file_type::REGULAR)
    } else {
        Ok(file_type::OTHER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dread_lists_entries_then_reports_end_of_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("a")).unwrap();

        let mut handle = open(dir.path()).unwrap();
        let first = handle.read(64).unwrap();
        assert_eq!(first, b"a\0".to_vec());

        let second = handle.read(64).unwrap();
        assert_eq!(second, vec![0]);
    }

    #[test]
    fn dread_truncates_long_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::File::create(dir.path().join("abcdef")).unwrap();

        let mut handle = open(dir.path()).unwrap();
        let name = handle.read(4).unwrap();
        assert_eq!(name, b"abc\0".to_vec());
    }

    #[test]
    fn stat_classifies_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("f");
        std::fs::File::create(&file_path).unwrap();

        assert_eq!(stat(&file_path).unwrap(), file_type::REGULAR);
        assert_eq!(stat(dir.path()).unwrap(), file_type::DIRECTORY);
    }

    #[test]
    fn stat_on_missing_path_is_bad_output() {
        let missing = Path::new("/does/not/exist/hopefully");
        assert_eq!(stat(missing), Err(Status::BadOutput));
    }
}
