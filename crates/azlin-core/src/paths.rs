use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// `~/.azlin`, created with mode `0700` on first access.
pub fn azlin_home() -> Result<PathBuf> {
    let home = home::home_dir().context("could not resolve home directory")?;
    let dir = home.join(".azlin");
    ensure_private_dir(&dir)?;
    Ok(dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(azlin_home()?.join("config.toml"))
}

pub fn cache_path() -> Result<PathBuf> {
    Ok(azlin_home()?.join("vm_list_cache.json"))
}

pub fn quotas_path() -> Result<PathBuf> {
    Ok(azlin_home()?.join("quotas.json"))
}

pub fn bastion_config_path() -> Result<PathBuf> {
    Ok(azlin_home()?.join("bastion_config.toml"))
}

pub fn connections_path() -> Result<PathBuf> {
    Ok(azlin_home()?.join("connections.json"))
}

pub fn ssh_key_paths() -> Result<(PathBuf, PathBuf)> {
    let dir = azlin_home()?.join("ssh");
    ensure_private_dir(&dir)?;
    Ok((
        dir.join("id_ed25519_azlin"),
        dir.join("id_ed25519_azlin.pub"),
    ))
}

/// Creates `dir` if absent and repairs its mode to `0700` if looser,
/// logging a warning rather than failing the caller.
#[cfg(unix)]
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if !dir.exists() {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
        return Ok(());
    }
    let meta = std::fs::metadata(dir)?;
    let mode = meta.permissions().mode() & 0o777;
    if mode != 0o700 {
        tracing::warn!(path = %dir.display(), mode = format!("{mode:o}"), "repairing insecure directory mode to 0700");
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

/// Repairs a file's mode to `0600` if looser. Assumes the file exists.
#[cfg(unix)]
pub fn ensure_private_file_mode(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let meta = std::fs::metadata(path)?;
    let mode = meta.permissions().mode() & 0o777;
    if mode != 0o600 {
        tracing::warn!(path = %path.display(), mode = format!("{mode:o}"), "repairing insecure file mode to 0600");
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn ensure_private_file_mode(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn ensure_private_dir_creates_with_0700() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested");
        ensure_private_dir(&dir).unwrap();
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn ensure_private_dir_repairs_loose_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("loose");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o755)).unwrap();
        ensure_private_dir(&dir).unwrap();
        let mode = std::fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn ensure_private_file_mode_repairs() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f.json");
        std::fs::write(&file, b"{}").unwrap();
        std::fs::set_permissions(&file, std::fs::Permissions::from_mode(0o644)).unwrap();
        ensure_private_file_mode(&file).unwrap();
        let mode = std::fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}
