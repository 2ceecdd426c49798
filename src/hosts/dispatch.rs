//! Run one action against many hosts at once.

use std::any::Any;
use std::thread;

use tracing::debug;

use crate::error::{HostError, Result, UpgradeError};

use super::Host;

/// Run `action` once per host, concurrently, and wait for all of them.
///
/// Every action runs to completion; one host failing does not stop the
/// others. Failures are reported together, in the order of `hosts`.
pub fn dispatch<H, F>(hosts: &[H], action: F) -> Result<()>
where
    H: Host + Sync,
    F: Fn(&H) -> Result<()> + Sync,
{
    dispatch_collect(hosts, action).map(|_| ())
}

/// Like [`dispatch`], returning each host's value (in input order) when
/// every host succeeded.
pub fn dispatch_collect<H, T, F>(hosts: &[H], action: F) -> Result<Vec<T>>
where
    H: Host + Sync,
    T: Send,
    F: Fn(&H) -> Result<T> + Sync,
{
    debug!("Dispatching to {} host(s)", hosts.len());

    let outcomes: Vec<thread::Result<Result<T>>> = thread::scope(|scope| {
        let handles: Vec<_> = hosts
            .iter()
            .map(|host| {
                let action = &action;
                scope.spawn(move || action(host))
            })
            .collect();

        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let mut values = Vec::with_capacity(hosts.len());
    let mut failures = Vec::new();

    for (host, outcome) in hosts.iter().zip(outcomes) {
        match outcome {
            Ok(Ok(value)) => values.push(value),
            Ok(Err(e)) => failures.push(HostError::new(host.hostname(), e)),
            Err(payload) => failures.push(HostError::new(
                host.hostname(),
                UpgradeError::HostPanicked {
                    message: panic_message(payload.as_ref()),
                },
            )),
        }
    }

    if failures.is_empty() {
        Ok(values)
    } else {
        Err(UpgradeError::Hosts(failures))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;

    fn hosts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn unreachable(host: &str) -> UpgradeError {
        UpgradeError::CommandFailed {
            command: format!("ssh {}", host),
            code: Some(255),
        }
    }

    #[test]
    fn empty_host_list_succeeds() {
        let none: Vec<String> = Vec::new();
        assert!(dispatch(&none, |_| Err(unreachable("nobody"))).is_ok());
    }

    #[test]
    fn runs_action_on_every_host() {
        let count = AtomicUsize::new(0);
        dispatch(&hosts(&["sdw1", "sdw2", "sdw3"]), |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn actions_run_concurrently() {
        // Deadlocks unless all three run at the same time.
        let barrier = Barrier::new(3);
        dispatch(&hosts(&["sdw1", "sdw2", "sdw3"]), |_| {
            barrier.wait();
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn failures_do_not_cancel_other_hosts() {
        let count = AtomicUsize::new(0);
        let err = dispatch(&hosts(&["sdw1", "sdw2", "sdw3"]), |host| {
            count.fetch_add(1, Ordering::SeqCst);
            if host == "sdw2" {
                Err(unreachable(host))
            } else {
                Ok(())
            }
        })
        .unwrap_err();

        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(err.failed_hosts(), vec!["sdw2"]);
    }

    #[test]
    fn all_failures_reported_in_host_order() {
        let err = dispatch(&hosts(&["sdw3", "sdw1", "sdw2"]), |host| {
            if host == "sdw2" {
                Ok(())
            } else {
                Err(unreachable(host))
            }
        })
        .unwrap_err();

        assert_eq!(err.failed_hosts(), vec!["sdw3", "sdw1"]);
    }

    #[test]
    fn panic_is_a_host_failure() {
        let err = dispatch(&hosts(&["sdw1", "sdw2"]), |host| {
            if host == "sdw1" {
                panic!("agent crashed");
            }
            Ok(())
        })
        .unwrap_err();

        assert_eq!(err.failed_hosts(), vec!["sdw1"]);
        assert!(err.to_string().contains("agent crashed"));
    }

    #[test]
    fn collect_returns_values_in_host_order() {
        let lengths = dispatch_collect(&hosts(&["a", "bbb", "cc"]), |host| Ok(host.len())).unwrap();
        assert_eq!(lengths, vec![1, 3, 2]);
    }
}
