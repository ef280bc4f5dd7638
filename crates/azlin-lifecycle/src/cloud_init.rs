use azlin_core::AzlinError;
use tera::{Context, Tera};

const DEFAULT_TEMPLATE: &str = r#"#cloud-config
package_update: true
packages:
  - git
  - build-essential
  - tmux
  - docker.io
  - curl
users:
  - name: {{ user }}
    ssh_authorized_keys:
      - {{ public_key }}
    sudo: ALL=(ALL) NOPASSWD:ALL
    shell: /bin/bash
runcmd:
  - "curl --proto '=https' --tlsv1.2 -sSf https://sh.rustup.rs | sh -s -- -y"
"#;

/// Renders the cloud-init document installed on first boot. A config
/// override (`provision.cloud_init_template` in `config.toml`) takes a
/// full Tera template string in place of the built-in one; both render
/// against the same `{user, public_key}` context.
pub fn render(user: &str, public_key: &str, template_override: Option<&str>) -> Result<String, AzlinError> {
    let template = template_override.unwrap_or(DEFAULT_TEMPLATE);
    let mut context = Context::new();
    context.insert("user", user);
    context.insert("public_key", public_key);
    Tera::one_off(template, &context, false)
        .map_err(|e| AzlinError::ValidationError(format!("cloud-init template: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_template_embeds_the_public_key() {
        let rendered = render("azlin", "ssh-ed25519 AAAA...", None).unwrap();
        assert!(rendered.contains("ssh-ed25519 AAAA..."));
        assert!(rendered.contains("name: azlin"));
    }

    #[test]
    fn override_template_is_used_when_provided() {
        let rendered = render("azlin", "key", Some("custom for {{ user }}")).unwrap();
        assert_eq!(rendered, "custom for azlin");
    }

    #[test]
    fn malformed_override_is_a_validation_error() {
        let err = render("azlin", "key", Some("{{ unterminated")).unwrap_err();
        assert!(matches!(err, AzlinError::ValidationError(_)));
    }
}
