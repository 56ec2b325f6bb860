//! Bounded sleep-and-recheck, shared by every wait phase. The timeout
//! policy stays declarative: callers pass an interval and a ceiling and
//! get back a tagged outcome instead of wiring their own loops.

use std::time::Duration;

#[derive(Debug)]
pub enum RetryOutcome {
    Satisfied {
        attempts: u32,
    },
    TimedOut {
        attempts: u32,
        last_error: Option<anyhow::Error>,
    },
}

/// Poll `predicate` once per `interval` until it reports true or the
/// `ceiling` budget is exhausted. The predicate is checked before the
/// first sleep, the total number of checks is exactly `ceiling /
/// interval`, and predicate errors are remembered but never abort the
/// loop.
pub fn retry_until<F>(interval: Duration, ceiling: Duration, mut predicate: F) -> RetryOutcome
where
    F: FnMut() -> anyhow::Result<bool>,
{
    let attempts = budgeted_attempts(interval, ceiling);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match predicate() {
            Ok(true) => return RetryOutcome::Satisfied { attempts: attempt },
            Ok(false) => {}
            Err(err) => last_error = Some(err),
        }

        if attempt < attempts {
            std::thread::sleep(interval);
        }
    }

    RetryOutcome::TimedOut {
        attempts,
        last_error,
    }
}

fn budgeted_attempts(interval: Duration, ceiling: Duration) -> u32 {
    let interval_ms = interval.as_millis().max(1);
    (ceiling.as_millis() / interval_ms).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn given_immediately_true_predicate_when_retry_then_satisfied_on_first_attempt() {
        let mut calls = 0;

        let outcome = retry_until(Duration::from_millis(2), Duration::from_millis(60), || {
            calls += 1;
            Ok(true)
        });

        assert!(matches!(outcome, RetryOutcome::Satisfied { attempts: 1 }));
        assert_eq!(calls, 1);
    }

    #[test]
    fn given_never_true_predicate_when_retry_then_exactly_ceiling_over_interval_attempts() {
        let mut calls = 0;

        let outcome = retry_until(Duration::from_millis(2), Duration::from_millis(60), || {
            calls += 1;
            Ok(false)
        });

        assert!(matches!(outcome, RetryOutcome::TimedOut { attempts: 30, .. }));
        assert_eq!(calls, 30);
    }

    #[test]
    fn given_predicate_true_on_third_attempt_when_retry_then_three_attempts() {
        let mut calls = 0;

        let outcome = retry_until(Duration::from_millis(1), Duration::from_millis(30), || {
            calls += 1;
            Ok(calls >= 3)
        });

        assert!(matches!(outcome, RetryOutcome::Satisfied { attempts: 3 }));
        assert_eq!(calls, 3);
    }

    #[test]
    fn given_erroring_predicate_when_retry_then_last_error_carried_into_timeout() {
        let outcome = retry_until(Duration::from_millis(1), Duration::from_millis(3), || {
            anyhow::bail!("runtime unreachable")
        });

        match outcome {
            RetryOutcome::TimedOut {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.unwrap().to_string().contains("runtime unreachable"));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn given_error_then_success_when_retry_then_satisfied() {
        let mut calls = 0;

        let outcome = retry_until(Duration::from_millis(1), Duration::from_millis(10), || {
            calls += 1;
            if calls == 1 {
                anyhow::bail!("transient")
            }
            Ok(true)
        });

        assert!(matches!(outcome, RetryOutcome::Satisfied { attempts: 2 }));
    }

    #[test]
    fn given_satisfied_first_attempt_when_retry_then_no_sleep_taken() {
        let started = Instant::now();

        retry_until(Duration::from_secs(60), Duration::from_secs(600), || Ok(true));

        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
