use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use usual_permission_bridge::{MethodChannel, PermissionDispatcher};
use usual_permission_platform::{DeviceProfile, SimulatedPlatform};

use crate::config::Config;

/// Logs go to stderr; stdout carries the channel.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

pub async fn load_profile(path: Option<&Path>) -> Result<DeviceProfile> {
    match path {
        Some(path) => DeviceProfile::load(path)
            .await
            .with_context(|| format!("Failed to load device profile {}", path.display())),
        None => Ok(DeviceProfile::default()),
    }
}

pub async fn build_channel(config: &Config) -> Result<MethodChannel> {
    let profile_path = config.profile_path();
    let profile = load_profile(profile_path.as_deref()).await?;
    info!(
        profile = ?profile_path,
        overlap = ?config.location.overlap,
        timeout_ms = ?config.location.timeout_ms,
        "building permission bridge"
    );

    let platform = SimulatedPlatform::new(&profile);
    let dispatcher = PermissionDispatcher::from_platform(&platform, config.location.options());
    Ok(MethodChannel::new(Arc::new(dispatcher)))
}
