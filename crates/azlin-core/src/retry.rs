use std::thread::sleep;
use std::time::Duration;

/// Retries `f` with exponential backoff starting at `base_delay`,
/// doubling each attempt, up to `max_attempts` total tries. Logs a
/// warning on every retry so operators can see flapping drivers in
/// the log stream without the caller having to instrument each call
/// site itself.
pub fn retry_with_backoff<T, E, F>(
    max_attempts: u32,
    base_delay: Duration,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Result<T, E>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f(attempt) {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = base_delay * 2u32.pow(attempt - 1);
                tracing::warn!(attempt, max_attempts, error = %e, delay_ms = delay.as_millis() as u64, "retrying after failure");
                sleep(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn succeeds_on_first_try() {
        let result: Result<i32, String> =
            retry_with_backoff(3, Duration::from_millis(1), |_| Ok(42));
        assert_eq!(result.unwrap(), 42);
    }

    #[test]
    fn retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, String> = retry_with_backoff(5, Duration::from_millis(1), |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err("not yet".to_string())
            } else {
                Ok(7)
            }
        });
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn exhausts_attempts_and_returns_last_error() {
        let result: Result<i32, String> =
            retry_with_backoff(3, Duration::from_millis(1), |n| Err(format!("fail {n}")));
        assert_eq!(result.unwrap_err(), "fail 3");
    }
}
