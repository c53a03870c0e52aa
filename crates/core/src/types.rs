use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BridgeError;

/// Permission kinds understood by the bridge, keyed by their wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    Notification,
    Camera,
    Storage,
    Calendar,
    Microphone,
    Location,
    Phone,
}

impl PermissionType {
    pub const ALL: [PermissionType; 7] = [
        PermissionType::Notification,
        PermissionType::Camera,
        PermissionType::Storage,
        PermissionType::Calendar,
        PermissionType::Microphone,
        PermissionType::Location,
        PermissionType::Phone,
    ];

    pub fn from_code(code: i64) -> Result<Self, BridgeError> {
        match code {
            0 => Ok(Self::Notification),
            1 => Ok(Self::Camera),
            2 => Ok(Self::Storage),
            3 => Ok(Self::Calendar),
            4 => Ok(Self::Microphone),
            5 => Ok(Self::Location),
            6 => Ok(Self::Phone),
            other => Err(BridgeError::InvalidPermissionType(other)),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Notification => 0,
            Self::Camera => 1,
            Self::Storage => 2,
            Self::Calendar => 3,
            Self::Microphone => 4,
            Self::Location => 5,
            Self::Phone => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Camera => "camera",
            Self::Storage => "storage",
            Self::Calendar => "calendar",
            Self::Microphone => "microphone",
            Self::Location => "location",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome reported back to the caller.
///
/// `Undetermined` only exists so logs can tell "never asked" apart from an
/// explicit refusal; on the wire it is indistinguishable from `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    Granted,
    Denied,
    Undetermined,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == Self::Granted
    }

    pub fn from_granted(granted: bool) -> Self {
        if granted {
            Self::Granted
        } else {
            Self::Denied
        }
    }

    /// Wire encoding: `"1"` when granted, `"0"` for everything else.
    pub fn as_wire(self) -> &'static str {
        if self.is_granted() {
            "1"
        } else {
            "0"
        }
    }

    /// Folds the statuses of a permission group. The group is granted only when
    /// every member is authorized; one explicit refusal denies it. An empty group
    /// is denied.
    pub fn all_of<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = AuthorizationStatus>,
    {
        let mut folded = None;
        for status in statuses {
            match status.to_state() {
                Self::Denied => return Self::Denied,
                Self::Undetermined => folded = Some(Self::Undetermined),
                Self::Granted => {
                    folded.get_or_insert(Self::Granted);
                }
            }
        }
        folded.unwrap_or(Self::Denied)
    }
}

/// How the OS asks the user for a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestRoute {
    /// A system dialog answered in place.
    #[default]
    Prompt,
    /// No runtime dialog exists; the user is sent to a settings page and the
    /// status is read again on return.
    Settings,
}

/// OS-native authorization values. Each adapter decides which of these count as granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    Provisional,
    Limited,
    AuthorizedAlways,
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Mapping used by every adapter except location: only full authorization grants.
    pub fn to_state(self) -> PermissionState {
        match self {
            Self::Authorized => PermissionState::Granted,
            Self::NotDetermined => PermissionState::Undetermined,
            _ => PermissionState::Denied,
        }
    }

    /// Location grants on either "always" or "while in use".
    pub fn to_location_state(self) -> PermissionState {
        match self {
            Self::AuthorizedAlways | Self::AuthorizedWhenInUse => PermissionState::Granted,
            Self::NotDetermined => PermissionState::Undetermined,
            _ => PermissionState::Denied,
        }
    }

    pub fn is_determined(self) -> bool {
        self != Self::NotDetermined
    }
}
