use azlin_core::AzlinError;

use crate::cloud::{AuthStatus, CloudDriver};

/// Resolves and caches the subscription/tenant id for the process.
/// Called once by the provisioning pipeline's preflight stage and by CLI
/// startup; a `PrereqMissing` is returned if the `az` binary itself is
/// absent, distinct from `AuthFailed` for "present but not logged in".
pub fn resolve(driver: &dyn CloudDriver) -> Result<AuthStatus, AzlinError> {
    if which::which("az").is_err() {
        return Err(AzlinError::PrereqMissing(
            "'az' CLI not found on PATH".to_string(),
        ));
    }
    driver.auth_status()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "test-util")]
    #[test]
    fn resolves_via_driver_when_az_present() {
        if which::which("az").is_err() {
            return;
        }
        let driver = crate::cloud::fake::FakeCloudDriver::new();
        let status = resolve(&driver).unwrap();
        assert_eq!(status.subscription_id, "fake-sub");
    }
}
