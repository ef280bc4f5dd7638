/// Validates a VM name against the bit-exact cloud naming rules.
///
/// Length 1-64. Must start and end with an ASCII alphanumeric. Body
/// restricted to `[A-Za-z0-9.-]`. Returns the first violated rule as
/// an error string beginning with one of the fixed phrases tests rely
/// on ("VM name cannot be empty", "Name too long", "must start with
/// alphanumeric", "cannot end with", "can only contain").
pub fn validate_vm_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("VM name cannot be empty".to_string());
    }
    if name.chars().count() > 64 {
        return Err(format!("Name too long: {} characters (max 64)", name.chars().count()));
    }
    let first = name.chars().next().unwrap();
    if !first.is_ascii_alphanumeric() {
        return Err(format!(
            "VM name must start with alphanumeric, got '{first}'"
        ));
    }
    let last = name.chars().last().unwrap();
    if !last.is_ascii_alphanumeric() {
        return Err(format!(
            "VM name cannot end with '{last}', must end with alphanumeric"
        ));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
    {
        return Err(format!(
            "VM name can only contain letters, digits, '.' and '-', got '{bad}'"
        ));
    }
    Ok(())
}

/// Validates the `azlin-session=<name>` tag value: `[A-Za-z0-9_-]{1,64}`.
pub fn validate_session_tag(name: &str) -> Result<(), String> {
    if name.is_empty() || name.chars().count() > 64 {
        return Err("session name must be 1-64 characters".to_string());
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(format!("session name contains invalid character '{bad}'"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        for n in ["a", "vm1", "dev-box", "my.vm-01", &"a".repeat(64)] {
            assert!(validate_vm_name(n).is_ok(), "expected {n} to be valid");
        }
    }

    #[test]
    fn rejects_empty() {
        let err = validate_vm_name("").unwrap_err();
        assert!(err.starts_with("VM name cannot be empty"));
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(65);
        let err = validate_vm_name(&name).unwrap_err();
        assert!(err.starts_with("Name too long"));
    }

    #[test]
    fn boundary_64_ok_65_rejected() {
        assert!(validate_vm_name(&"a".repeat(64)).is_ok());
        assert!(validate_vm_name(&"a".repeat(65)).is_err());
    }

    #[test]
    fn rejects_bad_start_and_end() {
        assert!(validate_vm_name("-vm").unwrap_err().contains("must start with alphanumeric"));
        assert!(validate_vm_name("vm-").unwrap_err().contains("cannot end with"));
        assert!(validate_vm_name("vm.").unwrap_err().contains("cannot end with"));
    }

    #[test]
    fn rejects_underscore_whitespace_and_unicode() {
        assert!(validate_vm_name("_bad").is_err());
        assert!(validate_vm_name("bad name").unwrap_err().contains("can only contain"));
        assert!(validate_vm_name("caf\u{e9}machine").is_err());
    }

    #[test]
    fn session_tag_rules() {
        assert!(validate_session_tag("my_session-1").is_ok());
        assert!(validate_session_tag("").is_err());
        assert!(validate_session_tag("has space").is_err());
        assert!(validate_session_tag(&"a".repeat(65)).is_err());
    }
}
