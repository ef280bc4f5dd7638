use azlin_core::{AzlinError, VmRecord};
use azlin_drivers::cloud::CloudDriver;

/// How a fleet operation's target set is specified on the command line.
/// Resolution never crosses resource groups — `all` and glob patterns
/// are scoped to the one resource group the caller names.
#[derive(Debug, Clone)]
pub enum Selector {
    All,
    Glob(String),
    List(Vec<String>),
}

impl Selector {
    /// Resolves the selector against the live VM list for `resource_group`.
    /// `List` entries that don't exist are dropped rather than erroring —
    /// the caller sees the gap in `Summary.total` vs. the list it asked for.
    pub fn resolve(&self, driver: &dyn CloudDriver, resource_group: &str) -> Result<Vec<VmRecord>, AzlinError> {
        let all = driver.list_vms(Some(resource_group))?;
        let matched = match self {
            Selector::All => all,
            Selector::Glob(pattern) => all.into_iter().filter(|vm| glob_match::glob_match(pattern, &vm.name)).collect(),
            Selector::List(names) => all.into_iter().filter(|vm| names.iter().any(|n| n == &vm.name)).collect(),
        };
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azlin_drivers::cloud::fake::FakeCloudDriver;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn vm(name: &str) -> VmRecord {
        VmRecord {
            name: name.to_string(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2404".into(),
            created_at: Utc::now(),
            tags: BTreeMap::new(),
            power_state: azlin_core::PowerState::Running,
            public_ip: Some("1.2.3.4".into()),
            private_ip: Some("10.0.0.4".into()),
            provisioning_state: "Succeeded".into(),
        }
    }

    fn driver_with(names: &[&str]) -> FakeCloudDriver {
        let driver = FakeCloudDriver::new();
        for name in names {
            driver.seed(vm(name));
        }
        driver
    }

    #[test]
    fn all_returns_every_vm_in_the_group() {
        let driver = driver_with(&["dev-1", "dev-2", "ci-1"]);
        let matched = Selector::All.resolve(&driver, "rg").unwrap();
        assert_eq!(matched.len(), 3);
    }

    #[test]
    fn glob_matches_by_shell_pattern() {
        let driver = driver_with(&["dev-1", "dev-2", "ci-1"]);
        let matched = Selector::Glob("dev-*".to_string()).resolve(&driver, "rg").unwrap();
        let mut names: Vec<_> = matched.iter().map(|v| v.name.clone()).collect();
        names.sort();
        assert_eq!(names, vec!["dev-1", "dev-2"]);
    }

    #[test]
    fn list_drops_names_that_do_not_exist() {
        let driver = driver_with(&["dev-1", "dev-2"]);
        let matched = Selector::List(vec!["dev-1".into(), "ghost".into()])
            .resolve(&driver, "rg")
            .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].name, "dev-1");
    }
}
