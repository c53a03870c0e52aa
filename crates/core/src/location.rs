//! Location authorization.
//!
//! Unlike the other kinds, the OS answers a location request through a delegate
//! callback at some later point, outside the call that asked. The adapter keeps
//! the waiting callers in a [`PendingLocationRequest`] slot which the delegate
//! drains exactly once per authorization change.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::traits::{LocationDelegate, LocationManager, PermissionAdapter};
use crate::types::{AuthorizationStatus, PermissionState, PermissionType};

/// What to do with a location request that arrives while another is still waiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Wait on the in-flight request and receive the same answer.
    #[default]
    Join,
    /// Fail fast with `AlreadyInProgress`.
    Reject,
}

#[derive(Debug, Clone, Default)]
pub struct LocationOptions {
    pub overlap: OverlapPolicy,
    /// `None` waits for the OS indefinitely.
    pub timeout: Option<Duration>,
}

/// Callers waiting for the next authorization-changed event.
#[derive(Default)]
pub struct PendingLocationRequest {
    waiters: Mutex<Vec<oneshot::Sender<PermissionState>>>,
}

impl PendingLocationRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while at least one live caller is waiting.
    pub fn is_awaiting(&self) -> bool {
        self.waiters.lock().iter().any(|waiter| !waiter.is_closed())
    }

    /// Number of live callers waiting.
    pub fn waiting(&self) -> usize {
        self.waiters
            .lock()
            .iter()
            .filter(|waiter| !waiter.is_closed())
            .count()
    }

    /// Adds a caller. Returns its receiver and whether the slot was idle, in
    /// which case the OS request still has to be issued.
    fn register(
        &self,
        overlap: OverlapPolicy,
    ) -> Result<(oneshot::Receiver<PermissionState>, bool), BridgeError> {
        let mut waiters = self.waiters.lock();
        // Callers that timed out or were dropped no longer hold the slot.
        waiters.retain(|waiter| !waiter.is_closed());

        let idle = waiters.is_empty();
        if !idle && overlap == OverlapPolicy::Reject {
            return Err(BridgeError::AlreadyInProgress(PermissionType::Location));
        }

        let (tx, rx) = oneshot::channel();
        waiters.push(tx);
        Ok((rx, idle))
    }
}

impl LocationDelegate for PendingLocationRequest {
    fn did_change_authorization(&self, status: AuthorizationStatus) {
        let waiters = std::mem::take(&mut *self.waiters.lock());
        if waiters.is_empty() {
            debug!(?status, "location authorization changed with nothing pending");
            return;
        }

        let state = status.to_location_state();
        let mut delivered = 0usize;
        for waiter in waiters {
            if waiter.send(state).is_ok() {
                delivered += 1;
            }
        }
        info!(?status, ?state, delivered, "resolved pending location request");
    }
}

pub struct LocationAdapter {
    manager: Arc<dyn LocationManager>,
    pending: Arc<PendingLocationRequest>,
    options: LocationOptions,
}

impl LocationAdapter {
    pub fn new(manager: Arc<dyn LocationManager>, options: LocationOptions) -> Self {
        Self {
            manager,
            pending: Arc::new(PendingLocationRequest::new()),
            options,
        }
    }

    pub fn pending(&self) -> &Arc<PendingLocationRequest> {
        &self.pending
    }
}

#[async_trait]
impl PermissionAdapter for LocationAdapter {
    fn kind(&self) -> PermissionType {
        PermissionType::Location
    }

    async fn current_state(&self) -> Result<PermissionState, BridgeError> {
        Ok(self.manager.authorization_status().to_location_state())
    }

    async fn request_state(&self) -> Result<PermissionState, BridgeError> {
        let (rx, idle) = match self.pending.register(self.options.overlap) {
            Ok(registered) => registered,
            Err(e) => {
                warn!("Rejected overlapping location request");
                return Err(e);
            }
        };

        // The slot lock is released by now: managers may call the delegate
        // synchronously when the OS has already decided.
        if idle {
            self.manager.set_delegate(self.pending.clone());
            self.manager.request_when_in_use_authorization();
            debug!("requested when-in-use authorization");
        } else {
            debug!(
                waiting = self.pending.waiting(),
                "joined in-flight location request"
            );
        }

        let answer = match self.options.timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(answer) => answer,
                Err(_) => {
                    warn!("Location authorization timed out after {}ms", limit.as_millis());
                    return Err(BridgeError::Timeout(PermissionType::Location));
                }
            },
            None => rx.await,
        };

        answer.map_err(|_| BridgeError::Unavailable("location manager released the request".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Manager whose events are fired by the test.
    struct ManualManager {
        status: Mutex<AuthorizationStatus>,
        delegate: Mutex<Option<Arc<dyn LocationDelegate>>>,
        requests: AtomicUsize,
    }

    impl ManualManager {
        fn new(status: AuthorizationStatus) -> Arc<Self> {
            Arc::new(Self {
                status: Mutex::new(status),
                delegate: Mutex::new(None),
                requests: AtomicUsize::new(0),
            })
        }

        fn fire(&self, status: AuthorizationStatus) {
            *self.status.lock() = status;
            let delegate = self.delegate.lock().clone();
            if let Some(delegate) = delegate {
                delegate.did_change_authorization(status);
            }
        }
    }

    impl LocationManager for ManualManager {
        fn authorization_status(&self) -> AuthorizationStatus {
            *self.status.lock()
        }

        fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
            *self.delegate.lock() = Some(delegate);
        }

        fn request_when_in_use_authorization(&self) {
            self.requests.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_single_request_resolves_on_event() {
        let manager = ManualManager::new(AuthorizationStatus::NotDetermined);
        let adapter = Arc::new(LocationAdapter::new(manager.clone(), LocationOptions::default()));

        let task = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.request_state().await }
        });
        settle().await;
        assert!(adapter.pending().is_awaiting());

        manager.fire(AuthorizationStatus::AuthorizedWhenInUse);
        assert_eq!(task.await.unwrap().unwrap(), PermissionState::Granted);
        assert!(!adapter.pending().is_awaiting());
        assert_eq!(manager.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_denied_event() {
        let manager = ManualManager::new(AuthorizationStatus::NotDetermined);
        let adapter = Arc::new(LocationAdapter::new(manager.clone(), LocationOptions::default()));

        let task = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.request_state().await }
        });
        settle().await;
        manager.fire(AuthorizationStatus::Denied);

        assert_eq!(task.await.unwrap().unwrap(), PermissionState::Denied);
    }

    #[test]
    fn test_event_without_pending_is_noop() {
        let pending = PendingLocationRequest::new();
        pending.did_change_authorization(AuthorizationStatus::AuthorizedAlways);
        assert!(!pending.is_awaiting());
    }

    #[tokio::test]
    async fn test_join_answers_both_callers() {
        let manager = ManualManager::new(AuthorizationStatus::NotDetermined);
        let adapter = Arc::new(LocationAdapter::new(manager.clone(), LocationOptions::default()));

        let first = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.request_state().await }
        });
        settle().await;
        let second = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.request_state().await }
        });
        settle().await;
        assert_eq!(adapter.pending().waiting(), 2);

        manager.fire(AuthorizationStatus::AuthorizedAlways);
        assert_eq!(first.await.unwrap().unwrap(), PermissionState::Granted);
        assert_eq!(second.await.unwrap().unwrap(), PermissionState::Granted);
        assert_eq!(manager.requests.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reject_fails_second_caller() {
        let manager = ManualManager::new(AuthorizationStatus::NotDetermined);
        let options = LocationOptions {
            overlap: OverlapPolicy::Reject,
            timeout: None,
        };
        let adapter = Arc::new(LocationAdapter::new(manager.clone(), options));

        let first = tokio::spawn({
            let adapter = adapter.clone();
            async move { adapter.request_state().await }
        });
        settle().await;

        let second = adapter.request_state().await;
        assert_eq!(
            second,
            Err(BridgeError::AlreadyInProgress(PermissionType::Location))
        );

        manager.fire(AuthorizationStatus::Denied);
        assert_eq!(first.await.unwrap().unwrap(), PermissionState::Denied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_frees_slot() {
        let manager = ManualManager::new(AuthorizationStatus::NotDetermined);
        let options = LocationOptions {
            overlap: OverlapPolicy::Reject,
            timeout: Some(Duration::from_millis(50)),
        };
        let adapter = LocationAdapter::new(manager.clone(), options);

        let result = adapter.request_state().await;
        assert_eq!(result, Err(BridgeError::Timeout(PermissionType::Location)));
        assert!(!adapter.pending().is_awaiting());

        // The abandoned entry does not block a fresh request; the OS request is re-issued.
        let retry = adapter.request_state();
        tokio::pin!(retry);
        tokio::select! {
            _ = &mut retry => panic!("resolved without an event"),
            _ = tokio::time::sleep(Duration::from_millis(10)) => {}
        }
        assert_eq!(manager.requests.load(Ordering::SeqCst), 2);
        manager.fire(AuthorizationStatus::AuthorizedWhenInUse);
        assert_eq!(retry.await.unwrap(), PermissionState::Granted);
    }

    #[tokio::test]
    async fn test_current_state_never_requests() {
        let manager = ManualManager::new(AuthorizationStatus::AuthorizedWhenInUse);
        let adapter = LocationAdapter::new(manager.clone(), LocationOptions::default());

        assert!(adapter.current_state().await.unwrap().is_granted());
        assert_eq!(manager.requests.load(Ordering::SeqCst), 0);
    }
}
