// VinSplit - platform/fs.rs
//
// Filesystem helpers for the CLI: size-capped input reads and output writes.
// The pipeline itself never touches the filesystem.

use crate::util::error::{VinSplitError, Result};
use std::io::{self, Read};
use std::path::Path;

/// Read a whole input file, refusing anything larger than `max_bytes`.
///
/// The size is checked from metadata before reading and enforced again while
/// reading, so a file that grows in between is still caught.
pub fn read_input(path: &Path, max_bytes: u64) -> Result<Vec<u8>> {
    let io_err = |source| VinSplitError::Io {
        path: path.to_path_buf(),
        operation: "read",
        source,
    };

    let metadata = std::fs::metadata(path).map_err(io_err)?;
    if !metadata.is_file() {
        return Err(io_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    if metadata.len() > max_bytes {
        return Err(io_err(too_large(metadata.len(), max_bytes)));
    }

    let file = std::fs::File::open(path).map_err(io_err)?;
    let mut bytes = Vec::with_capacity(metadata.len() as usize);
    file.take(max_bytes + 1)
        .read_to_end(&mut bytes)
        .map_err(io_err)?;
    if bytes.len() as u64 > max_bytes {
        return Err(io_err(too_large(bytes.len() as u64, max_bytes)));
    }

    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read input file");
    Ok(bytes)
}

fn too_large(size: u64, max_bytes: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("file is {size} bytes, exceeds the limit of {max_bytes} bytes"),
    )
}

/// Write `bytes` to `path`, creating parent directories as needed.
pub fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| VinSplitError::Io {
        path: path.to_path_buf(),
        operation: "write",
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    std::fs::write(path, bytes).map_err(io_err)?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "Wrote output file");
    Ok(())
}
