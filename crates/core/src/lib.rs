pub mod adapters;
pub mod error;
pub mod location;
pub mod traits;
pub mod types;

pub use adapters::{SettingsRoundTripAdapter, SystemAdapter, TelephonyAdapter};
pub use error::BridgeError;
pub use location::{LocationAdapter, LocationOptions, OverlapPolicy, PendingLocationRequest};
pub use traits::{
    HostSurface, LocationDelegate, LocationManager, NativeAuthorization, PermissionAdapter,
    Platform, SettingsOpener,
};
pub use types::*;
