use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use usual_permission_core::{AuthorizationStatus, PermissionType, RequestRoute};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Describes the device the simulated platform pretends to be.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceProfile {
    #[serde(default)]
    pub permissions: HashMap<PermissionType, PermissionProfile>,
    #[serde(default = "default_prompt_delay_ms")]
    pub location_prompt_delay_ms: u64,
    #[serde(default)]
    pub settings: SettingsProfile,
    /// Whether the app has a foreground screen. Without one nothing can be
    /// presented and requests resolve as denied.
    #[serde(default = "enabled")]
    pub host_attached: bool,
}

/// Starting status of one permission and what the user answers when prompted.
///
/// `group` splits the kind into several OS permissions, each with its own
/// status and answer; `status`/`answer` are then unused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionProfile {
    #[serde(default = "not_determined")]
    pub status: AuthorizationStatus,
    #[serde(default = "denied")]
    pub answer: AuthorizationStatus,
    #[serde(default)]
    pub route: RequestRoute,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub group: Vec<GroupMember>,
}

/// One OS permission inside a group, e.g. `read_calendar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub name: String,
    #[serde(default = "not_determined")]
    pub status: AuthorizationStatus,
    #[serde(default = "denied")]
    pub answer: AuthorizationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsProfile {
    #[serde(default = "default_settings_url")]
    pub url: String,
    #[serde(default = "default_access_url")]
    pub access_url: String,
    #[serde(default = "enabled")]
    pub can_open: bool,
    #[serde(default = "enabled")]
    pub open_succeeds: bool,
}

fn default_prompt_delay_ms() -> u64 {
    250
}

fn not_determined() -> AuthorizationStatus {
    AuthorizationStatus::NotDetermined
}

fn denied() -> AuthorizationStatus {
    AuthorizationStatus::Denied
}

fn default_settings_url() -> String {
    "app-settings:".to_string()
}

fn default_access_url() -> String {
    "app-settings:notification-access".to_string()
}

fn enabled() -> bool {
    true
}

impl DeviceProfile {
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let content = tokio::fs::read_to_string(&path).await?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ProfileError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        let content = serde_yaml::to_string(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    /// Profile for `kind`, falling back to "never asked, user refuses".
    pub fn permission(&self, kind: PermissionType) -> PermissionProfile {
        self.permissions.get(&kind).cloned().unwrap_or_default()
    }
}

impl PermissionProfile {
    pub fn new(status: AuthorizationStatus, answer: AuthorizationStatus) -> Self {
        Self {
            status,
            answer,
            ..Self::default()
        }
    }

    /// The OS permissions behind `kind`: the group when one is listed, otherwise
    /// a single member named after the kind.
    pub fn members(&self, kind: PermissionType) -> Vec<GroupMember> {
        if !self.group.is_empty() {
            return self.group.clone();
        }
        vec![GroupMember {
            name: kind.name().to_string(),
            status: self.status,
            answer: self.answer,
        }]
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            permissions: HashMap::new(),
            location_prompt_delay_ms: default_prompt_delay_ms(),
            settings: SettingsProfile::default(),
            host_attached: true,
        }
    }
}

impl Default for PermissionProfile {
    fn default() -> Self {
        Self {
            status: not_determined(),
            answer: denied(),
            route: RequestRoute::Prompt,
            group: Vec::new(),
        }
    }
}

impl Default for SettingsProfile {
    fn default() -> Self {
        Self {
            url: default_settings_url(),
            access_url: default_access_url(),
            can_open: true,
            open_succeeds: true,
        }
    }
}
