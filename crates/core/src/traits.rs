//! Seams between the bridge and the operating system.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::BridgeError;
use crate::types::{AuthorizationStatus, PermissionState, PermissionType, RequestRoute};

/// One OS authorization object (camera, photo library, ...).
#[async_trait]
pub trait NativeAuthorization: Send + Sync {
    /// Current status. Must never present UI.
    async fn status(&self) -> AuthorizationStatus;

    /// Ask the OS for access. Prompts only when the OS considers the permission
    /// undetermined; otherwise resolves with the existing decision.
    async fn request(&self) -> AuthorizationStatus;
}

/// Receives authorization changes from a [`LocationManager`].
pub trait LocationDelegate: Send + Sync {
    fn did_change_authorization(&self, status: AuthorizationStatus);
}

/// OS location manager. Authorization answers arrive through the delegate,
/// not as a return value.
pub trait LocationManager: Send + Sync {
    fn authorization_status(&self) -> AuthorizationStatus;

    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>);

    /// Fire-and-forget. The delegate is called later, possibly without any prompt.
    fn request_when_in_use_authorization(&self);
}

/// OS application-settings surface.
#[async_trait]
pub trait SettingsOpener: Send + Sync {
    /// Raw URL string the OS advertises for the app settings page.
    fn settings_url(&self) -> String;

    /// Page where the user grants notification access when the OS has no
    /// runtime dialog for it.
    fn notification_access_url(&self) -> String {
        self.settings_url()
    }

    fn can_open(&self, url: &url::Url) -> bool;

    /// Resolves with whether navigation actually happened, once the user is back.
    async fn open(&self, url: &url::Url) -> bool;
}

/// Whether a foreground screen exists to present permission UI on.
pub trait HostSurface: Send + Sync {
    fn is_attached(&self) -> bool;
}

/// Hands out the OS objects the adapter set is built from.
pub trait Platform: Send + Sync {
    /// Authorization objects backing `kind`. Several objects form a group that is
    /// granted only as a whole. Empty for kinds not backed by one (location, phone).
    fn authorizations(&self, kind: PermissionType) -> Vec<Arc<dyn NativeAuthorization>>;

    fn request_route(&self, _kind: PermissionType) -> RequestRoute {
        RequestRoute::Prompt
    }

    fn location_manager(&self) -> Arc<dyn LocationManager>;

    fn settings(&self) -> Arc<dyn SettingsOpener>;

    fn host(&self) -> Arc<dyn HostSurface>;
}

/// Query/request pair for one permission kind.
#[async_trait]
pub trait PermissionAdapter: Send + Sync {
    fn kind(&self) -> PermissionType;

    async fn current_state(&self) -> Result<PermissionState, BridgeError>;

    async fn request_state(&self) -> Result<PermissionState, BridgeError>;
}
