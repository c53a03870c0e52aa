//! In-process stand-in for the operating system's authorization services.
//!
//! Prompts are answered from the [`DeviceProfile`]; the location manager
//! delivers its answers through the delegate from a spawned task, the same way
//! a real OS calls back on its own schedule.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use usual_permission_core::{
    AuthorizationStatus, HostSurface, LocationDelegate, LocationManager, NativeAuthorization,
    PermissionType, Platform, RequestRoute, SettingsOpener,
};

use crate::profile::{DeviceProfile, GroupMember, PermissionProfile, SettingsProfile};

#[derive(Debug, Clone, Copy)]
struct Decision {
    status: AuthorizationStatus,
    answer: AuthorizationStatus,
}

pub struct SimulatedAuthorization {
    kind: PermissionType,
    name: String,
    decision: Mutex<Decision>,
    prompts: AtomicUsize,
}

impl SimulatedAuthorization {
    pub fn new(kind: PermissionType, member: &GroupMember) -> Self {
        Self {
            kind,
            name: member.name.clone(),
            decision: Mutex::new(Decision {
                status: member.status,
                answer: member.answer,
            }),
            prompts: AtomicUsize::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many times a user-facing prompt was shown.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Simulates the user flipping the switch in the system settings.
    pub fn set_status(&self, status: AuthorizationStatus) {
        self.decision.lock().status = status;
    }

    /// The user reached the access page and left it with their usual answer.
    fn answer_in_settings(&self) {
        let mut decision = self.decision.lock();
        if decision.status != AuthorizationStatus::Authorized {
            decision.status = decision.answer;
            info!(
                kind = %self.kind,
                name = %self.name,
                answer = ?decision.answer,
                "user changed access in settings"
            );
        }
    }
}

#[async_trait]
impl NativeAuthorization for SimulatedAuthorization {
    async fn status(&self) -> AuthorizationStatus {
        self.decision.lock().status
    }

    async fn request(&self) -> AuthorizationStatus {
        let mut decision = self.decision.lock();
        if !decision.status.is_determined() {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            decision.status = decision.answer;
            info!(
                kind = %self.kind,
                name = %self.name,
                answer = ?decision.answer,
                "user answered permission prompt"
            );
        }
        decision.status
    }
}

struct LocationState {
    decision: Decision,
    delegate: Option<Arc<dyn LocationDelegate>>,
}

pub struct SimulatedLocationManager {
    state: Arc<Mutex<LocationState>>,
    prompt_delay: Duration,
    requests: AtomicUsize,
    prompts: Arc<AtomicUsize>,
}

impl SimulatedLocationManager {
    pub fn new(profile: &PermissionProfile, prompt_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(LocationState {
                decision: Decision {
                    status: profile.status,
                    answer: profile.answer,
                },
                delegate: None,
            })),
            prompt_delay,
            requests: AtomicUsize::new(0),
            prompts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Changes the authorization outside of any request and notifies the delegate.
    pub fn change_authorization(&self, status: AuthorizationStatus) {
        Self::apply(&self.state, status);
    }

    fn apply(state: &Mutex<LocationState>, status: AuthorizationStatus) {
        let delegate = {
            let mut state = state.lock();
            state.decision.status = status;
            state.delegate.clone()
        };
        if let Some(delegate) = delegate {
            delegate.did_change_authorization(status);
        }
    }
}

impl LocationManager for SimulatedLocationManager {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.state.lock().decision.status
    }

    fn set_delegate(&self, delegate: Arc<dyn LocationDelegate>) {
        self.state.lock().delegate = Some(delegate);
    }

    fn request_when_in_use_authorization(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let decision = self.state.lock().decision;

        let state = self.state.clone();
        if decision.status.is_determined() {
            // Already decided: the OS reports the existing status without prompting.
            tokio::spawn(async move {
                Self::apply(&state, decision.status);
            });
            return;
        }

        self.prompts.fetch_add(1, Ordering::SeqCst);
        let delay = self.prompt_delay;
        debug!(delay_ms = delay.as_millis() as u64, "showing location prompt");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            info!(answer = ?decision.answer, "user answered location prompt");
            Self::apply(&state, decision.answer);
        });
    }
}

pub struct SimulatedSettings {
    profile: SettingsProfile,
    opened: AtomicUsize,
    /// Permissions the user can grant on the access page.
    access: Vec<Arc<SimulatedAuthorization>>,
}

impl SimulatedSettings {
    pub fn new(profile: SettingsProfile, access: Vec<Arc<SimulatedAuthorization>>) -> Self {
        Self {
            profile,
            opened: AtomicUsize::new(0),
            access,
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    fn is_access_page(&self, url: &url::Url) -> bool {
        url::Url::parse(&self.profile.access_url).is_ok_and(|access| &access == url)
    }
}

#[async_trait]
impl SettingsOpener for SimulatedSettings {
    fn settings_url(&self) -> String {
        self.profile.url.clone()
    }

    fn notification_access_url(&self) -> String {
        self.profile.access_url.clone()
    }

    fn can_open(&self, _url: &url::Url) -> bool {
        self.profile.can_open
    }

    async fn open(&self, url: &url::Url) -> bool {
        info!(%url, "opening settings");
        if !self.profile.open_succeeds {
            return false;
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        if self.is_access_page(url) {
            for native in &self.access {
                native.answer_in_settings();
            }
        }
        true
    }
}

/// Foreground screen of the simulated app.
pub struct SimulatedHost {
    attached: AtomicBool,
}

impl SimulatedHost {
    pub fn new(attached: bool) -> Self {
        Self {
            attached: AtomicBool::new(attached),
        }
    }

    pub fn attach(&self) {
        self.attached.store(true, Ordering::SeqCst);
    }

    pub fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

impl HostSurface for SimulatedHost {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }
}

pub struct SimulatedPlatform {
    authorizations: HashMap<PermissionType, Vec<Arc<SimulatedAuthorization>>>,
    routes: HashMap<PermissionType, RequestRoute>,
    location: Arc<SimulatedLocationManager>,
    settings: Arc<SimulatedSettings>,
    host: Arc<SimulatedHost>,
}

impl SimulatedPlatform {
    pub fn new(profile: &DeviceProfile) -> Self {
        let mut authorizations = HashMap::new();
        let mut routes = HashMap::new();
        let mut access = Vec::new();

        for kind in PermissionType::ALL {
            if matches!(kind, PermissionType::Location | PermissionType::Phone) {
                continue;
            }
            let permission = profile.permission(kind);
            let members: Vec<_> = permission
                .members(kind)
                .iter()
                .map(|member| Arc::new(SimulatedAuthorization::new(kind, member)))
                .collect();
            if permission.route == RequestRoute::Settings {
                access.extend(members.iter().cloned());
            }
            routes.insert(kind, permission.route);
            authorizations.insert(kind, members);
        }

        Self {
            authorizations,
            routes,
            location: Arc::new(SimulatedLocationManager::new(
                &profile.permission(PermissionType::Location),
                Duration::from_millis(profile.location_prompt_delay_ms),
            )),
            settings: Arc::new(SimulatedSettings::new(profile.settings.clone(), access)),
            host: Arc::new(SimulatedHost::new(profile.host_attached)),
        }
    }

    /// OS permissions behind `kind`; empty for location and phone.
    pub fn members(&self, kind: PermissionType) -> &[Arc<SimulatedAuthorization>] {
        self.authorizations
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn location(&self) -> &Arc<SimulatedLocationManager> {
        &self.location
    }

    pub fn settings_surface(&self) -> &Arc<SimulatedSettings> {
        &self.settings
    }

    pub fn host_surface(&self) -> &Arc<SimulatedHost> {
        &self.host
    }

    /// Total prompts shown for `kind`.
    pub fn prompts(&self, kind: PermissionType) -> usize {
        match kind {
            PermissionType::Location => self.location.prompts(),
            _ => self.members(kind).iter().map(|n| n.prompts()).sum(),
        }
    }
}

impl Platform for SimulatedPlatform {
    fn authorizations(&self, kind: PermissionType) -> Vec<Arc<dyn NativeAuthorization>> {
        self.members(kind)
            .iter()
            .map(|native| native.clone() as Arc<dyn NativeAuthorization>)
            .collect()
    }

    fn request_route(&self, kind: PermissionType) -> RequestRoute {
        self.routes.get(&kind).copied().unwrap_or_default()
    }

    fn location_manager(&self) -> Arc<dyn LocationManager> {
        self.location.clone()
    }

    fn settings(&self) -> Arc<dyn SettingsOpener> {
        self.settings.clone()
    }

    fn host(&self) -> Arc<dyn HostSurface> {
        self.host.clone()
    }
}
