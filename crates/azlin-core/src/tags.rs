//! The cloud resource tagging convention shared across components
//! `tag_manager`-style validation, grounded on the original
//! project's tag key/value rules: keys are alphanumeric plus `_-.`,
//! values non-empty.

pub const MANAGED_BY_KEY: &str = "managed-by";
pub const MANAGED_BY_VALUE: &str = "azlin";
pub const KEEP_KEY: &str = "azlin:keep";
pub const SESSION_KEY: &str = "azlin-session";
pub const ENVIRONMENT_KEY: &str = "environment";
pub const PRODUCTION_VALUE: &str = "production";

pub fn validate_tag_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("tag key cannot be empty".to_string());
    }
    if let Some(bad) = key
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
    {
        return Err(format!("tag key contains invalid character '{bad}'"));
    }
    Ok(())
}

pub fn validate_tag_value(value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err("tag value cannot be empty".to_string());
    }
    Ok(())
}

pub fn is_managed(tags: &std::collections::BTreeMap<String, String>) -> bool {
    tags.get(MANAGED_BY_KEY).map(String::as_str) == Some(MANAGED_BY_VALUE)
}

pub fn has_keep_tag(tags: &std::collections::BTreeMap<String, String>) -> bool {
    tags.get(KEEP_KEY).map(String::as_str) == Some("true")
}

pub fn is_production(tags: &std::collections::BTreeMap<String, String>) -> bool {
    tags.get(ENVIRONMENT_KEY).map(String::as_str) == Some(PRODUCTION_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn tag_key_rules() {
        assert!(validate_tag_key("managed-by").is_ok());
        assert!(validate_tag_key("azlin:keep").is_ok());
        assert!(validate_tag_key("").is_err());
        assert!(validate_tag_key("bad key").is_err());
    }

    #[test]
    fn detects_managed_keep_and_production() {
        let mut tags = BTreeMap::new();
        tags.insert(MANAGED_BY_KEY.to_string(), MANAGED_BY_VALUE.to_string());
        tags.insert(KEEP_KEY.to_string(), "true".to_string());
        tags.insert(ENVIRONMENT_KEY.to_string(), PRODUCTION_VALUE.to_string());
        assert!(is_managed(&tags));
        assert!(has_keep_tag(&tags));
        assert!(is_production(&tags));
    }

    #[test]
    fn absent_tags_are_false() {
        let tags = BTreeMap::new();
        assert!(!is_managed(&tags));
        assert!(!has_keep_tag(&tags));
        assert!(!is_production(&tags));
    }
}
