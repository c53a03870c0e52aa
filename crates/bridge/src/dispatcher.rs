use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use usual_permission_core::{
    BridgeError, HostSurface, LocationOptions, PermissionAdapter, PermissionState, PermissionType,
    Platform, SettingsOpener,
};

use crate::registry::AdapterSet;

/// Operations the bridge answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    CheckPermission,
    RequestPermission,
    OpenNotificationSettings,
}

impl Method {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "checkPermission" => Some(Self::CheckPermission),
            "requestPermission" => Some(Self::RequestPermission),
            "openNotificationSettings" => Some(Self::OpenNotificationSettings),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CheckPermission => "checkPermission",
            Self::RequestPermission => "requestPermission",
            Self::OpenNotificationSettings => "openNotificationSettings",
        }
    }
}

pub struct PermissionDispatcher {
    adapters: Arc<AdapterSet>,
    settings: Arc<dyn SettingsOpener>,
    host: Arc<dyn HostSurface>,
}

impl PermissionDispatcher {
    pub fn new(
        adapters: Arc<AdapterSet>,
        settings: Arc<dyn SettingsOpener>,
        host: Arc<dyn HostSurface>,
    ) -> Self {
        Self {
            adapters,
            settings,
            host,
        }
    }

    pub fn from_platform(platform: &dyn Platform, location: LocationOptions) -> Self {
        Self::new(
            Arc::new(AdapterSet::from_platform(platform, location)),
            platform.settings(),
            platform.host(),
        )
    }

    pub fn adapters(&self) -> &AdapterSet {
        &self.adapters
    }

    /// Routes a named call with untyped arguments.
    pub async fn dispatch(
        &self,
        method: &str,
        arguments: &Value,
    ) -> Result<PermissionState, BridgeError> {
        let method = Method::parse(method)
            .ok_or_else(|| BridgeError::NotImplemented(method.to_string()))?;

        let result = match method {
            Method::CheckPermission => {
                let kind = permission_type(arguments)?;
                let request = arguments
                    .get("request")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                self.check_permission(kind, request).await
            }
            Method::RequestPermission => {
                let kind = permission_type(arguments)?;
                self.request_permission(kind).await
            }
            Method::OpenNotificationSettings => self.open_notification_settings().await,
        };

        match &result {
            Ok(state) => info!(method = method.name(), ?state, "call completed"),
            Err(e) => warn!(method = method.name(), code = e.code(), "call failed: {}", e),
        }
        result
    }

    /// Granted short-circuits; otherwise prompts only when `request` is set.
    pub async fn check_permission(
        &self,
        kind: PermissionType,
        request: bool,
    ) -> Result<PermissionState, BridgeError> {
        let adapter = self.adapter(kind)?;
        let current = adapter.current_state().await?;
        if current.is_granted() || !request {
            return Ok(current);
        }
        info!(%kind, ?current, "not granted, requesting");
        self.request_on_host(adapter).await
    }

    pub async fn request_permission(
        &self,
        kind: PermissionType,
    ) -> Result<PermissionState, BridgeError> {
        info!(%kind, "requesting permission");
        let adapter = self.adapter(kind)?;
        self.request_on_host(adapter).await
    }

    pub async fn open_notification_settings(&self) -> Result<PermissionState, BridgeError> {
        if !self.host.is_attached() {
            warn!("No foreground screen to open settings from");
            return Err(BridgeError::Unavailable("Cannot open settings".into()));
        }

        let raw = self.settings.settings_url();
        let url = url::Url::parse(&raw).map_err(|e| {
            warn!("Settings URL {:?} is malformed: {}", raw, e);
            BridgeError::Unavailable("Cannot open settings".into())
        })?;

        if !self.settings.can_open(&url) {
            return Err(BridgeError::Unavailable("Cannot open settings".into()));
        }

        let opened = self.settings.open(&url).await;
        Ok(PermissionState::from_granted(opened))
    }

    /// Runs the request flow. Nothing can be shown without a foreground screen,
    /// so a permission that is not already granted resolves as denied there.
    /// Telephony needs no UI.
    async fn request_on_host(
        &self,
        adapter: Arc<dyn PermissionAdapter>,
    ) -> Result<PermissionState, BridgeError> {
        let kind = adapter.kind();
        if kind == PermissionType::Phone || self.host.is_attached() {
            return adapter.request_state().await;
        }

        let current = adapter.current_state().await?;
        if !current.is_granted() {
            warn!(%kind, "no foreground screen, request not shown");
            return Ok(PermissionState::Denied);
        }
        Ok(current)
    }

    fn adapter(&self, kind: PermissionType) -> Result<Arc<dyn PermissionAdapter>, BridgeError> {
        self.adapters.get(kind).ok_or_else(|| {
            BridgeError::Unavailable(format!("No {} support on this platform", kind))
        })
    }
}

fn permission_type(arguments: &Value) -> Result<PermissionType, BridgeError> {
    let code = arguments
        .as_object()
        .and_then(|args| args.get("type"))
        .and_then(Value::as_i64)
        .ok_or_else(|| BridgeError::InvalidArgument("Missing or invalid arguments".into()))?;
    PermissionType::from_code(code)
}
