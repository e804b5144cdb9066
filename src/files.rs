//! File reads through `cap-std` directory handles.
//!
//! Paths are split into a parent directory opened with ambient authority and
//! a file name resolved inside it.

use std::io;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs_utf8::Dir};

fn open_parent(path: &Utf8Path) -> io::Result<(Dir, &str)> {
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path has no file name: {path}"),
        )
    })?;
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    let dir = Dir::open_ambient_dir(parent, ambient_authority())?;
    Ok((dir, file_name))
}

/// Reads the whole file at `path` as bytes.
///
/// # Errors
///
/// Returns the underlying I/O error when the directory or file cannot be
/// opened or read.
pub fn read_ambient(path: &Utf8Path) -> io::Result<Vec<u8>> {
    let (dir, file_name) = open_parent(path)?;
    dir.read(file_name)
}

/// Reads the whole file at `path` as UTF-8 text.
///
/// # Errors
///
/// Returns the underlying I/O error when the file cannot be read or is not
/// valid UTF-8.
pub fn read_to_string_ambient(path: &Utf8Path) -> io::Result<String> {
    let (dir, file_name) = open_parent(path)?;
    dir.read_to_string(file_name)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn reads_files_by_absolute_path() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");
        let dir = Dir::open_ambient_dir(&root, ambient_authority()).expect("open temp dir");
        dir.write("ca.pem", "-----BEGIN CERTIFICATE-----\n")
            .expect("write");

        let path = root.join("ca.pem");
        assert_eq!(
            read_to_string_ambient(&path).expect("read text"),
            "-----BEGIN CERTIFICATE-----\n"
        );
        assert_eq!(
            read_ambient(&path).expect("read bytes"),
            b"-----BEGIN CERTIFICATE-----\n"
        );
    }

    #[test]
    fn missing_file_is_not_found() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 path");

        let err = read_ambient(&root.join("absent.pem")).expect_err("file is absent");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
