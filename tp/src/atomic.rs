use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use log::trace;

use crate::ProtoError;

/// Replace `path` with `contents` so readers see either the old or the new file, never a mix
///
/// The temporary file lives in the same directory so the final rename stays on one filesystem.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), ProtoError> {
    trace!("write_atomic: {} ({} bytes)", path.display(), contents.len());
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = tempfile::Builder::new()
        .prefix(".")
        .suffix(".tmp")
        .permissions(Permissions::from_mode(0o644))
        .tempfile_in(dir)
        .map_err(|e| ProtoError::io(dir, e))?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| ProtoError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ProtoError::io(path, e.error))?;
    Ok(())
}
