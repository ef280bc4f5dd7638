use std::path::Path;

use anyhow::{Context, Result};

use crate::paths::set_mode;

/// Serializes `bytes` to `<path>.tmp`, sets mode `0600`, then renames
/// over `path`. The rename is the atomicity boundary: a crash before
/// it leaves the prior file untouched, a crash after leaves the new
/// file in place. A stale `.tmp` from an interrupted previous write is
/// silently overwritten on the next call.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = tmp_path(path);
    std::fs::write(&tmp, bytes).with_context(|| format!("writing {}", tmp.display()))?;
    set_mode(&tmp, 0o600)?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} to {}", tmp.display(), path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> std::path::PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".tmp");
    s.into()
}
