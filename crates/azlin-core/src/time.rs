use chrono::{DateTime, Duration, Utc};

/// A tier's freshness is tracked as `Option<DateTime<Utc>>`: `None`
/// means "never set", which is always expired regardless of TTL. This
/// is cleaner in Rust than a zero-epoch sentinel float.
pub fn is_expired(ts: Option<DateTime<Utc>>, ttl: Duration) -> bool {
    match ts {
        None => true,
        Some(t) => Utc::now() - t > ttl,
    }
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// True if `ts` is within one second of now, used by tests asserting
/// "freshly stamped" per the round-trip properties.
pub fn is_fresh(ts: DateTime<Utc>) -> bool {
    (Utc::now() - ts).num_milliseconds().abs() <= 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_always_expired() {
        assert!(is_expired(None, Duration::days(365)));
    }

    #[test]
    fn recent_timestamp_not_expired() {
        assert!(!is_expired(Some(Utc::now()), Duration::seconds(300)));
    }

    #[test]
    fn old_timestamp_expired() {
        let old = Utc::now() - Duration::seconds(301);
        assert!(is_expired(Some(old), Duration::seconds(300)));
    }

    #[test]
    fn fresh_timestamp_detected() {
        assert!(is_fresh(Utc::now()));
        assert!(!is_fresh(Utc::now() - Duration::seconds(5)));
    }
}
