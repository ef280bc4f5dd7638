use std::collections::BTreeMap;

use azlin_core::tags;

/// Shared safety-invariant checks consulted by every destructive path
/// in the Governor. Kept in one module so the invariant is enforced
/// exactly once rather than re-derived per call site.
#[derive(Default)]
pub struct DeletionGate {
    pub allow_production_override: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RefusedKeepTag,
    RefusedProduction,
    RefusedAttached,
    RefusedShared,
}

impl DeletionGate {
    pub fn check(
        &self,
        tags: &BTreeMap<String, String>,
        attached: bool,
        shared: bool,
    ) -> GateDecision {
        if attached {
            return GateDecision::RefusedAttached;
        }
        if tags::has_keep_tag(tags) {
            return GateDecision::RefusedKeepTag;
        }
        if shared {
            return GateDecision::RefusedShared;
        }
        if tags::is_production(tags) && !self.allow_production_override {
            return GateDecision::RefusedProduction;
        }
        GateDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags_with(key: &str, value: &str) -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert(key.to_string(), value.to_string());
        m
    }

    #[test]
    fn keep_tag_refuses_even_when_unattached() {
        let gate = DeletionGate::default();
        let tags = tags_with(tags::KEEP_KEY, "true");
        assert_eq!(gate.check(&tags, false, false), GateDecision::RefusedKeepTag);
    }

    #[test]
    fn production_refused_without_override() {
        let gate = DeletionGate::default();
        let tags = tags_with(tags::ENVIRONMENT_KEY, tags::PRODUCTION_VALUE);
        assert_eq!(gate.check(&tags, false, false), GateDecision::RefusedProduction);
    }

    #[test]
    fn production_allowed_with_override() {
        let gate = DeletionGate {
            allow_production_override: true,
        };
        let tags = tags_with(tags::ENVIRONMENT_KEY, tags::PRODUCTION_VALUE);
        assert_eq!(gate.check(&tags, false, false), GateDecision::Allow);
    }

    #[test]
    fn attached_always_refused() {
        let gate = DeletionGate::default();
        assert_eq!(gate.check(&BTreeMap::new(), true, false), GateDecision::RefusedAttached);
    }

    #[test]
    fn plain_resource_allowed() {
        let gate = DeletionGate::default();
        assert_eq!(gate.check(&BTreeMap::new(), false, false), GateDecision::Allow);
    }
}
