// Copyright (C) 2026 Marcus L. Hanestad <marlhan@proton.me>
//
// This file is part of Pagecast.
//
// Pagecast is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Pagecast is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Pagecast.  If not, see <https://www.gnu.org/licenses/>.

use std::future::Future;
use std::net::Ipv4Addr;

use futures::{stream, StreamExt};
use log::warn;

use crate::control::ControlError;

/// Upper bound on in-flight control requests, so a large target list does
/// not open a socket per phone at once.
pub const MAX_IN_FLIGHT: usize = 32;

/// Send one request to every target and partition the outcomes.
///
/// Outcomes are collected as the requests complete, a failed target is
/// logged and moved to the failure list without touching its siblings, and
/// the call returns only once every request has finished. Every target ends
/// up in exactly one of the two lists.
pub async fn broadcast<F, Fut>(
    targets: &[Ipv4Addr],
    send: F,
) -> (Vec<Ipv4Addr>, Vec<(Ipv4Addr, ControlError)>)
where
    F: Fn(Ipv4Addr) -> Fut,
    Fut: Future<Output = Result<(), ControlError>>,
{
    let mut outcomes = stream::iter(targets.iter().copied())
        .map(|target| {
            let request = send(target);
            async move { (target, request.await) }
        })
        .buffer_unordered(MAX_IN_FLIGHT);

    let mut survivors = Vec::new();
    let mut failures = Vec::new();

    while let Some((target, outcome)) = outcomes.next().await {
        match outcome {
            Ok(()) => survivors.push(target),
            Err(err) => {
                warn!("{target}: removed ({err})");
                failures.push((target, err));
            }
        }
    }

    (survivors, failures)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    fn targets(n: u8) -> Vec<Ipv4Addr> {
        (0..n).map(|i| Ipv4Addr::new(10, 0, 0, i)).collect()
    }

    fn refused() -> ControlError {
        ControlError::Transport("connection refused".to_owned())
    }

    #[tokio::test]
    async fn partitions_every_target_exactly_once() {
        let all = targets(10);
        let (survivors, failures) = broadcast(&all, |target| async move {
            if target.octets()[3] % 2 == 0 {
                Ok(())
            } else {
                Err(refused())
            }
        })
        .await;

        let mut classified = BTreeSet::new();
        classified.extend(survivors.iter().copied());
        classified.extend(failures.iter().map(|(t, _)| *t));
        let expected: BTreeSet<Ipv4Addr> = all.iter().copied().collect();
        assert_eq!(classified, expected);
        assert_eq!(survivors.len() + failures.len(), all.len());
        assert!(survivors.iter().all(|t| t.octets()[3] % 2 == 0));
        assert!(failures.iter().all(|(t, _)| t.octets()[3] % 2 == 1));
    }

    #[tokio::test]
    async fn all_failures_empty_survivors() {
        let all = targets(5);
        let (survivors, failures) = broadcast(&all, |_| async { Err(refused()) }).await;

        assert!(survivors.is_empty());
        assert_eq!(failures.len(), all.len());
    }

    #[tokio::test]
    async fn failure_does_not_abort_siblings() {
        let all = targets(6);
        let (survivors, failures) = broadcast(&all, |target| async move {
            if target.octets()[3] == 0 {
                // First submitted target fails immediately; the rest finish
                // after it.
                Err(refused())
            } else {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            }
        })
        .await;

        assert_eq!(failures.len(), 1);
        assert_eq!(survivors.len(), 5);
    }

    #[tokio::test]
    async fn in_flight_requests_stay_bounded() {
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let all = targets(200);
        let (survivors, failures) = broadcast(&all, |_| async {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(survivors.len(), 200);
        assert!(failures.is_empty());
        assert!(peak.load(Ordering::SeqCst) <= MAX_IN_FLIGHT);
    }
}
