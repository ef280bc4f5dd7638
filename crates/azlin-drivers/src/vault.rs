use std::path::Path;

use anyhow::Result;
use azlin_core::AzlinError;
use zeroize::Zeroizing;

use crate::shell;

/// `TryFetchKey`/`PushKey`. A miss on fetch is recovered
/// locally by the Lifecycle Orchestrator (falls back to local
/// generation), never surfaced as an error here — the `bool` return
/// models that contract directly instead of `Result<(), NotFound>`.
pub trait SecretVaultDriver: Send + Sync {
    fn try_fetch_key(&self, vm: &str, rg: &str, local_path: &Path) -> Result<bool, AzlinError>;
    fn push_key(&self, vm: &str, rg: &str, local_path: &Path) -> Result<(), AzlinError>;
}

/// Shells out to `az keyvault secret`, storing the private key under a
/// `<vm>-<rg>` secret name (sanitized: vault secret names are
/// alphanumeric-and-dash only).
pub struct AzureKeyVaultDriver {
    pub vault_name: String,
}

impl AzureKeyVaultDriver {
    pub fn new(vault_name: impl Into<String>) -> Self {
        AzureKeyVaultDriver {
            vault_name: vault_name.into(),
        }
    }

    fn secret_name(vm: &str, rg: &str) -> String {
        format!("azlin-{vm}-{rg}")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
            .collect()
    }
}

impl SecretVaultDriver for AzureKeyVaultDriver {
    fn try_fetch_key(&self, vm: &str, rg: &str, local_path: &Path) -> Result<bool, AzlinError> {
        let name = Self::secret_name(vm, rg);
        let out = shell::run(
            "az",
            &[
                "keyvault",
                "secret",
                "show",
                "--vault-name",
                &self.vault_name,
                "--name",
                &name,
                "--query",
                "value",
                "-o",
                "tsv",
            ],
        )
        .map_err(|e| AzlinError::InternalError(e.to_string()))?;
        if !out.status.success() {
            tracing::debug!(stderr = %String::from_utf8_lossy(&out.stderr), "secret vault fetch miss");
            return Ok(false);
        }
        let key = Zeroizing::new(out.stdout);
        std::fs::write(local_path, &*key).map_err(|e| AzlinError::InternalError(e.to_string()))?;
        azlin_core::paths::set_mode(local_path, 0o600)
            .map_err(|e| AzlinError::InternalError(e.to_string()))?;
        Ok(true)
    }

    fn push_key(&self, vm: &str, rg: &str, local_path: &Path) -> Result<(), AzlinError> {
        let name = Self::secret_name(vm, rg);
        let contents = std::fs::read_to_string(local_path)
            .map_err(|e| AzlinError::InternalError(e.to_string()))?;
        let out = shell::run(
            "az",
            &[
                "keyvault",
                "secret",
                "set",
                "--vault-name",
                &self.vault_name,
                "--name",
                &name,
                "--value",
                &contents,
            ],
        )
        .map_err(|e| AzlinError::InternalError(e.to_string()))?;
        if !out.status.success() {
            return Err(AzlinError::classify_stderr(&String::from_utf8_lossy(&out.stderr)));
        }
        Ok(())
    }
}

/// No-op vault for environments without Key Vault configured: every
/// fetch misses, every push is a no-op. This is what `default_provider`
/// style factories fall back to.
pub struct NullVaultDriver;

impl SecretVaultDriver for NullVaultDriver {
    fn try_fetch_key(&self, _vm: &str, _rg: &str, _local_path: &Path) -> Result<bool, AzlinError> {
        Ok(false)
    }

    fn push_key(&self, _vm: &str, _rg: &str, _local_path: &Path) -> Result<(), AzlinError> {
        Ok(())
    }
}

/// Picks `AzureKeyVaultDriver` when `AZLIN_KEY_VAULT` names a vault,
/// else `NullVaultDriver`.
pub fn default_provider() -> Box<dyn SecretVaultDriver> {
    match std::env::var("AZLIN_KEY_VAULT") {
        Ok(name) if !name.is_empty() => Box::new(AzureKeyVaultDriver::new(name)),
        _ => Box::new(NullVaultDriver),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_name_is_sanitized() {
        let name = AzureKeyVaultDriver::secret_name("vm.1", "rg_a");
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
    }

    #[test]
    fn null_driver_always_misses_and_accepts_pushes() {
        let driver = NullVaultDriver;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("key");
        assert!(!driver.try_fetch_key("vm", "rg", &path).unwrap());
        std::fs::write(&path, b"key-material").unwrap();
        assert!(driver.push_key("vm", "rg", &path).is_ok());
    }
}
