pub mod channel;
pub mod dispatcher;
pub mod registry;

pub use channel::{ChannelError, MethodCall, MethodChannel, MethodResponse, CHANNEL_NAME};
pub use dispatcher::{Method, PermissionDispatcher};
pub use registry::AdapterSet;
