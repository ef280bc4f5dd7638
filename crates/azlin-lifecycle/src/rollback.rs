use azlin_core::AzlinError;
use azlin_drivers::cloud::CloudDriver;

#[derive(Debug, Clone)]
pub enum RollbackAction {
    DeleteVm { resource_group: String, name: String },
    UntagVm { resource_group: String, name: String },
}

/// Stages 5+ push an undo action on success; a fatal error anywhere
/// from that point runs the stack LIFO. Stages 1-4 never push here —
/// nothing irreversible has happened yet.
#[derive(Debug, Default)]
pub struct RollbackStack(Vec<RollbackAction>);

impl RollbackStack {
    pub fn new() -> Self {
        RollbackStack::default()
    }

    pub fn push(&mut self, action: RollbackAction) {
        self.0.push(action);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Executes every pushed action in reverse order, collecting
    /// failures rather than stopping at the first one.
    pub fn execute(&mut self, driver: &dyn CloudDriver) -> Result<(), AzlinError> {
        let mut failures = Vec::new();
        while let Some(action) = self.0.pop() {
            let result = match &action {
                RollbackAction::DeleteVm { resource_group, name } => driver.delete_vm(resource_group, name),
                RollbackAction::UntagVm { resource_group, name } => {
                    driver.set_tags(resource_group, name, &std::collections::BTreeMap::new())
                }
            };
            if let Err(e) = result {
                failures.push(format!("{action:?}: {e}"));
            }
        }
        if !failures.is_empty() {
            return Err(AzlinError::RollbackError(failures.join("; ")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azlin_drivers::cloud::fake::FakeCloudDriver;
    use azlin_core::VmRecord;
    use chrono::Utc;
    use std::collections::BTreeMap;

    #[test]
    fn rollback_deletes_in_lifo_order() {
        let driver = FakeCloudDriver::new();
        driver.seed(VmRecord {
            name: "vm1".into(),
            resource_group: "rg".into(),
            region: "eastus".into(),
            size: "Standard_B1s".into(),
            image: "Ubuntu2204".into(),
            created_at: Utc::now(),
            tags: BTreeMap::new(),
            power_state: azlin_core::PowerState::Running,
            public_ip: Some("1.2.3.4".into()),
            private_ip: Some("10.0.0.4".into()),
            provisioning_state: "Succeeded".into(),
        });
        let mut stack = RollbackStack::new();
        stack.push(RollbackAction::DeleteVm {
            resource_group: "rg".into(),
            name: "vm1".into(),
        });
        stack.execute(&driver).unwrap();
        assert!(driver.vms.lock().unwrap().is_empty());
    }

    #[test]
    fn empty_stack_is_a_no_op() {
        let driver = FakeCloudDriver::new();
        let mut stack = RollbackStack::new();
        assert!(stack.is_empty());
        stack.execute(&driver).unwrap();
    }
}
