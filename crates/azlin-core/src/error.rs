use thiserror::Error;

/// The closed error taxonomy surfaced by every azlin component. Driver
/// implementations classify raw stderr into one of these at the
/// boundary; nothing above the driver layer should match on strings.
#[derive(Debug, Error)]
pub enum AzlinError {
    #[error("prerequisite missing: {0}")]
    PrereqMissing(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    #[error("resource already exists: {0}")]
    ResourceConflict(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("local port in use: {0}")]
    PortInUse(String),

    #[error("rollback failed: {0}")]
    RollbackError(String),

    #[error("corrupted on-disk state: {0}")]
    CorruptedState(String),

    #[error("provisioning failed: {0}")]
    ProvisioningError(String),

    #[error("connection failed: {0}")]
    ConnectionError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl AzlinError {
    /// The process exit code assigned to this category, where one
    /// applies outside the general 1/internal-error fallback.
    pub fn exit_code(&self) -> i32 {
        match self {
            AzlinError::PrereqMissing(_) => 2,
            AzlinError::AuthFailed(_) => 3,
            AzlinError::ProvisioningError(_) => 4,
            AzlinError::ConnectionError(_) => 5,
            _ => 1,
        }
    }

    /// One-line remediation hint for CLI display.
    pub fn remediation(&self) -> Option<&'static str> {
        match self {
            AzlinError::AuthFailed(_) => Some("Run `az login`."),
            AzlinError::PrereqMissing(_) => Some("Install and configure the Azure CLI (`az`)."),
            AzlinError::QuotaExceeded(_) => Some("Raise the quota with `azlin quota set` or free capacity."),
            AzlinError::PortInUse(_) => Some("Free a local port in 50000-60000 and retry."),
            _ => None,
        }
    }

    /// Classify a driver's stderr into the taxonomy by matching known
    /// substrings, falling back to `InternalError` with the message
    /// preserved verbatim, never invented.
    pub fn classify_stderr(stderr: &str) -> AzlinError {
        let lower = stderr.to_lowercase();
        if lower.contains("not found") || lower.contains("resourcenotfound") {
            AzlinError::ResourceNotFound(sanitize(stderr))
        } else if lower.contains("authentication") || lower.contains("please run 'az login'") {
            AzlinError::AuthFailed(sanitize(stderr))
        } else if lower.contains("forbidden") || lower.contains("authorizationfailed") {
            AzlinError::InsufficientPermissions(sanitize(stderr))
        } else if lower.contains("conflict") || lower.contains("already exists") {
            AzlinError::ResourceConflict(sanitize(stderr))
        } else if lower.contains("quota") {
            AzlinError::QuotaExceeded(sanitize(stderr))
        } else if lower.contains("timed out") || lower.contains("timeout") {
            AzlinError::Timeout(sanitize(stderr))
        } else if lower.contains("unreachable") || lower.contains("no route to host") {
            AzlinError::NetworkUnreachable(sanitize(stderr))
        } else if lower.contains("address already in use") {
            AzlinError::PortInUse(sanitize(stderr))
        } else {
            AzlinError::InternalError(sanitize(stderr))
        }
    }
}

/// Collapse a raw CLI stderr blob to a short, single-line description
/// safe to log at non-debug level. The full text still goes to the
/// debug channel by the caller before this is invoked.
fn sanitize(stderr: &str) -> String {
    stderr
        .lines()
        .find(|l| !l.trim().is_empty())
        .unwrap_or(stderr)
        .trim()
        .chars()
        .take(200)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_taxonomy() {
        assert_eq!(AzlinError::PrereqMissing("x".into()).exit_code(), 2);
        assert_eq!(AzlinError::AuthFailed("x".into()).exit_code(), 3);
        assert_eq!(AzlinError::ProvisioningError("x".into()).exit_code(), 4);
        assert_eq!(AzlinError::ConnectionError("x".into()).exit_code(), 5);
        assert_eq!(AzlinError::InternalError("x".into()).exit_code(), 1);
    }

    #[test]
    fn classifies_known_substrings() {
        assert!(matches!(
            AzlinError::classify_stderr("ERROR: (ResourceNotFound) VM not found"),
            AzlinError::ResourceNotFound(_)
        ));
        assert!(matches!(
            AzlinError::classify_stderr("Please run 'az login' to setup account."),
            AzlinError::AuthFailed(_)
        ));
        assert!(matches!(
            AzlinError::classify_stderr("bind: address already in use"),
            AzlinError::PortInUse(_)
        ));
        assert!(matches!(
            AzlinError::classify_stderr("something bizarre happened"),
            AzlinError::InternalError(_)
        ));
    }

    #[test]
    fn sanitize_truncates_and_picks_first_nonblank_line() {
        let raw = "\n\n  real message here\nextra trailing junk";
        assert_eq!(sanitize(raw), "real message here");
    }
}
