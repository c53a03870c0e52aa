use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::BridgeError;
use crate::traits::{NativeAuthorization, PermissionAdapter, SettingsOpener};
use crate::types::{AuthorizationStatus, PermissionState, PermissionType};

async fn statuses(natives: &[Arc<dyn NativeAuthorization>]) -> Vec<AuthorizationStatus> {
    let mut statuses = Vec::with_capacity(natives.len());
    for native in natives {
        statuses.push(native.status().await);
    }
    statuses
}

/// Adapter over completion-handler style OS authorization objects.
///
/// Usually one object per kind. Where the OS splits a kind into several
/// permissions (read and write calendar, fine and coarse location) the adapter
/// holds all of them and grants only when every one is authorized.
pub struct SystemAdapter {
    kind: PermissionType,
    natives: Vec<Arc<dyn NativeAuthorization>>,
}

impl SystemAdapter {
    pub fn new(kind: PermissionType, native: Arc<dyn NativeAuthorization>) -> Self {
        Self::group(kind, vec![native])
    }

    pub fn group(kind: PermissionType, natives: Vec<Arc<dyn NativeAuthorization>>) -> Self {
        Self { kind, natives }
    }

    pub fn members(&self) -> usize {
        self.natives.len()
    }
}

#[async_trait]
impl PermissionAdapter for SystemAdapter {
    fn kind(&self) -> PermissionType {
        self.kind
    }

    async fn current_state(&self) -> Result<PermissionState, BridgeError> {
        let statuses = statuses(&self.natives).await;
        let state = PermissionState::all_of(statuses.iter().copied());
        debug!(kind = %self.kind, ?statuses, ?state, "queried authorization");
        Ok(state)
    }

    async fn request_state(&self) -> Result<PermissionState, BridgeError> {
        let mut statuses = Vec::with_capacity(self.natives.len());
        for native in &self.natives {
            statuses.push(native.request().await);
        }
        let state = PermissionState::all_of(statuses.iter().copied());
        debug!(kind = %self.kind, ?statuses, ?state, "authorization request completed");
        Ok(state)
    }
}

/// Adapter for permissions the OS only grants from a settings page.
///
/// A request navigates to the page and reads the status again once the user
/// comes back; there is no dialog to answer.
pub struct SettingsRoundTripAdapter {
    kind: PermissionType,
    natives: Vec<Arc<dyn NativeAuthorization>>,
    settings: Arc<dyn SettingsOpener>,
}

impl SettingsRoundTripAdapter {
    pub fn new(
        kind: PermissionType,
        natives: Vec<Arc<dyn NativeAuthorization>>,
        settings: Arc<dyn SettingsOpener>,
    ) -> Self {
        Self {
            kind,
            natives,
            settings,
        }
    }
}

#[async_trait]
impl PermissionAdapter for SettingsRoundTripAdapter {
    fn kind(&self) -> PermissionType {
        self.kind
    }

    async fn current_state(&self) -> Result<PermissionState, BridgeError> {
        let statuses = statuses(&self.natives).await;
        let state = PermissionState::all_of(statuses.iter().copied());
        debug!(kind = %self.kind, ?statuses, ?state, "queried authorization");
        Ok(state)
    }

    async fn request_state(&self) -> Result<PermissionState, BridgeError> {
        let before = self.current_state().await?;
        if before.is_granted() {
            return Ok(before);
        }

        let raw = self.settings.notification_access_url();
        let url = url::Url::parse(&raw).map_err(|e| {
            warn!("Access settings URL {:?} is malformed: {}", raw, e);
            BridgeError::Unavailable("Cannot open settings".into())
        })?;
        if !self.settings.can_open(&url) {
            return Err(BridgeError::Unavailable("Cannot open settings".into()));
        }

        if !self.settings.open(&url).await {
            warn!(kind = %self.kind, %url, "settings page did not open");
        }

        let after = self.current_state().await?;
        debug!(kind = %self.kind, ?before, ?after, "returned from settings");
        Ok(after)
    }
}

/// The platform has no telephony permission; calls are always allowed.
pub struct TelephonyAdapter;

#[async_trait]
impl PermissionAdapter for TelephonyAdapter {
    fn kind(&self) -> PermissionType {
        PermissionType::Phone
    }

    async fn current_state(&self) -> Result<PermissionState, BridgeError> {
        Ok(PermissionState::Granted)
    }

    async fn request_state(&self) -> Result<PermissionState, BridgeError> {
        Ok(PermissionState::Granted)
    }
}
