// This file is part of the terraform-provider-mongodbatlas project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Waiting for asynchronous Atlas operations.
//!
//! Most mutating calls return before the remote object is ready. A
//! [`StateChangeConf`] describes which statuses mean "still working" and which
//! mean "done", and [`StateChangeConf::wait_for`] re-fetches the object until
//! one of the done statuses shows up.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{sleep, timeout_at, Instant};

use crate::client::ApiError;
use crate::utils::DisplayJoinable;

const INITIAL_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WaitError {
    #[error(
        "timeout while waiting for state to become '{}' (last state: '{last_status}', timeout: {timeout:?})",
        .target.iter().join_with(", ")
    )]
    Timeout {
        target: &'static [&'static str],
        last_status: String,
        timeout: Duration,
    },
    #[error(
        "unexpected state '{status}', wanted target '{}'",
        .target.iter().join_with(", ")
    )]
    UnexpectedState {
        status: String,
        target: &'static [&'static str],
    },
    #[error(transparent)]
    Refresh(#[from] ApiError),
}

#[derive(Debug, Clone, Copy)]
pub struct StateChangeConf {
    pub pending: &'static [&'static str],
    pub target: &'static [&'static str],
    pub timeout: Duration,
    pub min_interval: Duration,
    pub delay: Duration,
}

impl StateChangeConf {
    /// Polls `refresh` until it reports a target status, and returns the
    /// object fetched by that last call.
    pub async fn wait_for<T, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), ApiError>>,
    {
        let deadline = Instant::now() + self.timeout;
        let timed_out = |last_status: String| WaitError::Timeout {
            target: self.target,
            last_status,
            timeout: self.timeout,
        };

        if !self.delay.is_zero() {
            sleep(self.delay.min(self.timeout)).await;
        }

        let mut last_status = String::new();
        let mut backoff = INITIAL_BACKOFF;
        loop {
            if Instant::now() >= deadline {
                return Err(timed_out(last_status));
            }

            let (object, status) = match timeout_at(deadline, refresh()).await {
                Ok(refreshed) => refreshed?,
                Err(_) => return Err(timed_out(last_status)),
            };

            if self.target.contains(&status.as_str()) {
                tracing::debug!(%status, "reached target state");
                return Ok(object);
            }
            if !self.pending.contains(&status.as_str()) {
                return Err(WaitError::UnexpectedState {
                    status,
                    target: self.target,
                });
            }

            let wait = backoff.max(self.min_interval);
            backoff = (backoff * 2).min(MAX_BACKOFF);
            tracing::debug!(%status, ?wait, "still pending");
            last_status = status;

            let remaining = deadline.saturating_duration_since(Instant::now());
            sleep(wait.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    const CONF: StateChangeConf = StateChangeConf {
        pending: &["INITIATING", "FINALIZING"],
        target: &["AVAILABLE", "PENDING_ACCEPTANCE"],
        timeout: Duration::from_secs(3600),
        min_interval: Duration::from_secs(10),
        delay: Duration::from_secs(30),
    };

    fn scripted(statuses: &[&str]) -> Mutex<VecDeque<String>> {
        Mutex::new(statuses.iter().map(|s| s.to_string()).collect())
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_target_object() {
        let statuses = scripted(&["INITIATING", "FINALIZING", "AVAILABLE", "INITIATING"]);
        let calls = AtomicUsize::new(0);
        let started = Instant::now();

        let result = CONF
            .wait_for(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                let status = statuses.lock().unwrap().pop_front().unwrap();
                async move { Ok((n, status)) }
            })
            .await
            .unwrap();

        assert_eq!(result, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // delay, then two waits bounded below by the minimum interval
        assert!(started.elapsed() >= Duration::from_secs(50));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn target_on_first_refresh() {
        let calls = AtomicUsize::new(0);
        let started = Instant::now();
        let result = CONF
            .wait_for(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(("peer", "PENDING_ACCEPTANCE".to_owned())) }
            })
            .await
            .unwrap();
        assert_eq!(result, "peer");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn times_out_while_pending() {
        let started = Instant::now();
        let err = CONF
            .wait_for(|| async { Ok(((), "INITIATING".to_owned())) })
            .await
            .unwrap_err();

        match &err {
            WaitError::Timeout {
                last_status,
                timeout,
                ..
            } => {
                assert_eq!(last_status, "INITIATING");
                assert_eq!(*timeout, Duration::from_secs(3600));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_secs(3600));
        assert_eq!(
            err.to_string(),
            "timeout while waiting for state to become 'AVAILABLE, PENDING_ACCEPTANCE' (last state: 'INITIATING', timeout: 3600s)"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_refresh_is_bounded_by_timeout() {
        let conf = StateChangeConf {
            delay: Duration::ZERO,
            timeout: Duration::from_secs(60),
            ..CONF
        };
        let err = conf
            .wait_for(|| async {
                sleep(Duration::from_secs(600)).await;
                Ok(((), "AVAILABLE".to_owned()))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_status_aborts() {
        for status in ["FAILED", ""] {
            let err = CONF
                .wait_for(|| {
                    let status = status.to_owned();
                    async move { Ok(((), status)) }
                })
                .await
                .unwrap_err();
            match err {
                WaitError::UnexpectedState { status: got, .. } => assert_eq!(got, status),
                other => panic!("expected an unexpected state, got {other:?}"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_errors_propagate() {
        let calls = AtomicUsize::new(0);
        let err = CONF
            .wait_for(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err::<((), String), _>(ApiError::Transport("connection refused".into())) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::Refresh(ApiError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_to_cap() {
        let conf = StateChangeConf {
            delay: Duration::ZERO,
            min_interval: Duration::ZERO,
            ..CONF
        };
        let statuses = scripted(&[
            "INITIATING", "INITIATING", "INITIATING", "INITIATING", "INITIATING", "INITIATING",
            "INITIATING", "INITIATING", "AVAILABLE",
        ]);
        let started = Instant::now();
        conf.wait_for(|| {
            let status = statuses.lock().unwrap().pop_front().unwrap();
            async move { Ok(((), status)) }
        })
        .await
        .unwrap();
        // 0.1 + 0.2 + 0.4 + 0.8 + 1.6 + 3.2 + 6.4 + 10
        assert_eq!(started.elapsed(), Duration::from_millis(22_700));
    }
}
