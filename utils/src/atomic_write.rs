//! Atomic file write helper.
//!
//! Uses a temp file + rename pattern so that readers polling the destination
//! (the node exporter's textfile collector, shell scripts reading the current
//! price) never observe a truncated file.

use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Exported files are read by collectors running as other users.
#[cfg(unix)]
const EXPORT_MODE: u32 = 0o644;

/// Replace `path` with `bytes` in one rename.
///
/// The temp file is created next to `path`, so the parent directory must
/// exist. The result is readable by everyone and writable by the owner.
pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(parent)?;
    #[cfg(unix)]
    {
        use std::fs::{Permissions, set_permissions};
        use std::os::unix::fs::PermissionsExt;
        set_permissions(tmp.path(), Permissions::from_mode(EXPORT_MODE))?;
    }

    tmp.write_all(bytes)?;
    tmp.persist(path).map_err(|err| err.error)?;
    Ok(())
}
