use std::collections::HashMap;
use std::sync::Arc;
use usual_permission_core::{
    LocationAdapter, LocationOptions, PermissionAdapter, PermissionType, Platform, RequestRoute,
    SettingsRoundTripAdapter, SystemAdapter, TelephonyAdapter,
};

/// One adapter per permission kind.
pub struct AdapterSet {
    adapters: HashMap<PermissionType, Arc<dyn PermissionAdapter>>,
}

impl AdapterSet {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Builds the full set from what the platform exposes. Kinds the platform has
    /// no authorization object for are left unregistered; kinds backed by several
    /// objects get one adapter over the whole group.
    pub fn from_platform(platform: &dyn Platform, location: LocationOptions) -> Self {
        let mut set = Self::new();
        for kind in PermissionType::ALL {
            match kind {
                PermissionType::Location => {
                    set.register(Arc::new(LocationAdapter::new(
                        platform.location_manager(),
                        location.clone(),
                    )));
                }
                PermissionType::Phone => {
                    set.register(Arc::new(TelephonyAdapter));
                }
                other => {
                    let natives = platform.authorizations(other);
                    if natives.is_empty() {
                        continue;
                    }
                    match platform.request_route(other) {
                        RequestRoute::Prompt => {
                            set.register(Arc::new(SystemAdapter::group(other, natives)));
                        }
                        RequestRoute::Settings => {
                            set.register(Arc::new(SettingsRoundTripAdapter::new(
                                other,
                                natives,
                                platform.settings(),
                            )));
                        }
                    }
                }
            }
        }
        set
    }

    pub fn register(&mut self, adapter: Arc<dyn PermissionAdapter>) -> &mut Self {
        self.adapters.insert(adapter.kind(), adapter);
        self
    }

    pub fn get(&self, kind: PermissionType) -> Option<Arc<dyn PermissionAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    pub fn count(&self) -> usize {
        self.adapters.len()
    }
}

impl Default for AdapterSet {
    fn default() -> Self {
        Self::new()
    }
}
