pub mod profile;
pub mod simulated;

pub use profile::{DeviceProfile, GroupMember, PermissionProfile, ProfileError, SettingsProfile};
pub use simulated::{
    SimulatedAuthorization, SimulatedHost, SimulatedLocationManager, SimulatedPlatform,
    SimulatedSettings,
};
