//! Fixed cost tables consulted by the Fleet Operations Engine (hourly
//! compute deltas) and the Orphan Governor (monthly storage cost
//! estimates). Centralized here so both components cite the same
//! numbers instead of maintaining duplicate copies.

/// Hourly compute rate by SKU, `$/hr`. Falls back to `DEFAULT_HOURLY`
/// when the SKU is not in the table.
pub const DEFAULT_HOURLY: f64 = 0.10;

const VM_HOURLY_RATES: &[(&str, f64)] = &[
    ("Standard_B1s", 0.0104),
    ("Standard_D2s_v3", 0.096),
    ("Standard_D4s_v3", 0.192),
    ("Standard_D8s_v3", 0.384),
];

pub fn hourly_rate(sku: &str) -> f64 {
    VM_HOURLY_RATES
        .iter()
        .find(|(s, _)| *s == sku)
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_HOURLY)
}

/// Monthly cost per GB for managed disks, by tier.
pub const PREMIUM_DISK_PER_GB_MONTH: f64 = 0.1536;
pub const STANDARD_DISK_PER_GB_MONTH: f64 = 0.04;
pub const SNAPSHOT_PER_GB_MONTH: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTier {
    Hot,
    Cool,
    Archive,
}

pub fn storage_per_gb_month(tier: StorageTier) -> f64 {
    match tier {
        StorageTier::Hot => 0.0184,
        StorageTier::Cool => 0.01,
        StorageTier::Archive => 0.00099,
    }
}

pub fn disk_monthly_cost(size_gb: i64, premium: bool) -> f64 {
    let rate = if premium {
        PREMIUM_DISK_PER_GB_MONTH
    } else {
        STANDARD_DISK_PER_GB_MONTH
    };
    size_gb as f64 * rate
}

pub fn snapshot_monthly_cost(size_gb: i64) -> f64 {
    size_gb as f64 * SNAPSHOT_PER_GB_MONTH
}

pub fn storage_monthly_cost(size_gb: i64, tier: StorageTier) -> f64 {
    size_gb as f64 * storage_per_gb_month(tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sku_rate() {
        assert_eq!(hourly_rate("Standard_D2s_v3"), 0.096);
    }

    #[test]
    fn unknown_sku_falls_back_to_default() {
        assert_eq!(hourly_rate("Standard_Unknown_v99"), DEFAULT_HOURLY);
    }

    #[test]
    fn disk_costs_by_tier() {
        assert!((disk_monthly_cost(100, true) - 15.36).abs() < 1e-9);
        assert!((disk_monthly_cost(100, false) - 4.0).abs() < 1e-9);
    }
}
