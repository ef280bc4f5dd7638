//! Provisioning backend selection. Today `az` is the only backend;
//! the enum exists so a future `Terraform`/`Pulumi` backend has
//! somewhere to land without reshaping the `CloudDriver` call sites.

use crate::cloud::{AzureCliDriver, CloudDriver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudStrategy {
    AzureCli,
}

impl CloudStrategy {
    pub fn driver(self) -> Box<dyn CloudDriver> {
        match self {
            CloudStrategy::AzureCli => Box::new(AzureCliDriver::new()),
        }
    }
}

impl Default for CloudStrategy {
    fn default() -> Self {
        CloudStrategy::AzureCli
    }
}
