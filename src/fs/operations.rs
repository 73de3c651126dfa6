use std::{
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;

/// Replaces the contents of `path` with `contents`. The data is first written into a temporary file
/// next to the target and then renamed over it, so readers either see the old file or the new one,
/// never a truncated one.
pub fn write_atomically(path: &Path, contents: &[u8]) -> Result<(), io::Error> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}
