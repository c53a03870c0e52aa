#[cfg(test)]
mod simulated_tests {
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use usual_permission_core::*;
    use usual_permission_platform::*;

    #[derive(Default)]
    struct RecordingDelegate {
        seen: Mutex<Vec<AuthorizationStatus>>,
    }

    impl LocationDelegate for RecordingDelegate {
        fn did_change_authorization(&self, status: AuthorizationStatus) {
            self.seen.lock().push(status);
        }
    }

    fn profile_with(
        kind: PermissionType,
        status: AuthorizationStatus,
        answer: AuthorizationStatus,
    ) -> DeviceProfile {
        let mut permissions = HashMap::new();
        permissions.insert(kind, PermissionProfile::new(status, answer));
        DeviceProfile {
            permissions,
            location_prompt_delay_ms: 100,
            ..DeviceProfile::default()
        }
    }

    #[tokio::test]
    async fn test_prompt_only_when_undetermined() {
        let profile = profile_with(
            PermissionType::Microphone,
            AuthorizationStatus::NotDetermined,
            AuthorizationStatus::Authorized,
        );
        let platform = SimulatedPlatform::new(&profile);
        let natives = platform.authorizations(PermissionType::Microphone);
        assert_eq!(natives.len(), 1);
        let native = &natives[0];

        assert_eq!(native.status().await, AuthorizationStatus::NotDetermined);
        assert_eq!(native.request().await, AuthorizationStatus::Authorized);
        assert_eq!(native.request().await, AuthorizationStatus::Authorized);
        assert_eq!(platform.prompts(PermissionType::Microphone), 1);
    }

    #[test]
    fn test_location_and_phone_have_no_authorization_object() {
        let platform = SimulatedPlatform::new(&DeviceProfile::default());
        assert!(platform.authorizations(PermissionType::Location).is_empty());
        assert!(platform.authorizations(PermissionType::Phone).is_empty());
        assert_eq!(platform.authorizations(PermissionType::Calendar).len(), 1);
        assert_eq!(platform.members(PermissionType::Calendar)[0].name(), "calendar");
        assert_eq!(
            platform.request_route(PermissionType::Notification),
            RequestRoute::Prompt
        );
        assert!(platform.host().is_attached());
    }

    #[tokio::test]
    async fn test_group_members_answer_separately() {
        let yaml = r#"
permissions:
  location:
    group:
      - name: fine
  calendar:
    group:
      - name: read_calendar
        answer: authorized
      - name: write_calendar
        answer: denied
"#;
        let platform = SimulatedPlatform::new(&DeviceProfile::from_yaml(yaml).unwrap());

        let natives = platform.authorizations(PermissionType::Calendar);
        assert_eq!(natives.len(), 2);
        assert_eq!(natives[0].request().await, AuthorizationStatus::Authorized);
        assert_eq!(natives[1].request().await, AuthorizationStatus::Denied);
        assert_eq!(platform.prompts(PermissionType::Calendar), 2);

        // Location keeps its single manager whatever the profile lists.
        assert!(platform.authorizations(PermissionType::Location).is_empty());
    }

    #[tokio::test]
    async fn test_access_page_applies_answer() {
        let mut profile = profile_with(
            PermissionType::Notification,
            AuthorizationStatus::Denied,
            AuthorizationStatus::Authorized,
        );
        if let Some(notification) = profile.permissions.get_mut(&PermissionType::Notification) {
            notification.route = RequestRoute::Settings;
        }
        let platform = SimulatedPlatform::new(&profile);
        let settings = platform.settings();
        let native = platform.members(PermissionType::Notification)[0].clone();
        assert_eq!(
            platform.request_route(PermissionType::Notification),
            RequestRoute::Settings
        );

        // The app settings page leaves access untouched.
        let app = url::Url::parse(&settings.settings_url()).unwrap();
        assert!(settings.open(&app).await);
        assert_eq!(native.status().await, AuthorizationStatus::Denied);

        let access = url::Url::parse(&settings.notification_access_url()).unwrap();
        assert!(settings.open(&access).await);
        assert_eq!(native.status().await, AuthorizationStatus::Authorized);
        assert_eq!(platform.settings_surface().opened(), 2);
    }

    #[test]
    fn test_host_attachment() {
        let profile = DeviceProfile {
            host_attached: false,
            ..DeviceProfile::default()
        };
        let platform = SimulatedPlatform::new(&profile);
        let host = platform.host();
        assert!(!host.is_attached());

        platform.host_surface().attach();
        assert!(host.is_attached());
        platform.host_surface().detach();
        assert!(!host.is_attached());
    }

    #[tokio::test]
    async fn test_unsolicited_location_change_reaches_delegate() {
        let platform = SimulatedPlatform::new(&DeviceProfile::default());
        let manager = platform.location_manager();

        // No delegate yet: the status still changes.
        platform.location().change_authorization(AuthorizationStatus::Restricted);
        assert_eq!(manager.authorization_status(), AuthorizationStatus::Restricted);

        let delegate = Arc::new(RecordingDelegate::default());
        manager.set_delegate(delegate.clone());
        platform.location().change_authorization(AuthorizationStatus::AuthorizedAlways);

        assert_eq!(*delegate.seen.lock(), vec![AuthorizationStatus::AuthorizedAlways]);
        assert_eq!(platform.location().requests(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_location_prompt_answers_after_delay() {
        let profile = profile_with(
            PermissionType::Location,
            AuthorizationStatus::NotDetermined,
            AuthorizationStatus::AuthorizedWhenInUse,
        );
        let platform = SimulatedPlatform::new(&profile);
        let manager = platform.location_manager();
        let delegate = Arc::new(RecordingDelegate::default());
        manager.set_delegate(delegate.clone());

        manager.request_when_in_use_authorization();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(delegate.seen.lock().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            *delegate.seen.lock(),
            vec![AuthorizationStatus::AuthorizedWhenInUse]
        );
        assert_eq!(
            manager.authorization_status(),
            AuthorizationStatus::AuthorizedWhenInUse
        );
        assert_eq!(platform.location().prompts(), 1);
    }

    #[tokio::test]
    async fn test_decided_location_reports_without_prompt() {
        let profile = profile_with(
            PermissionType::Location,
            AuthorizationStatus::Denied,
            AuthorizationStatus::AuthorizedAlways,
        );
        let platform = SimulatedPlatform::new(&profile);
        let manager = platform.location_manager();
        let delegate = Arc::new(RecordingDelegate::default());
        manager.set_delegate(delegate.clone());

        manager.request_when_in_use_authorization();
        tokio::task::yield_now().await;

        assert_eq!(*delegate.seen.lock(), vec![AuthorizationStatus::Denied]);
        assert_eq!(platform.location().prompts(), 0);
        assert_eq!(platform.location().requests(), 1);
    }

    #[tokio::test]
    async fn test_settings_surface() {
        let mut profile = DeviceProfile::default();
        profile.settings.open_succeeds = false;
        let platform = SimulatedPlatform::new(&profile);
        let settings = platform.settings();

        let url = url::Url::parse(&settings.settings_url()).unwrap();
        assert!(settings.can_open(&url));
        assert!(!settings.open(&url).await);
        assert_eq!(platform.settings_surface().opened(), 0);
    }

    #[tokio::test]
    async fn test_profile_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("device.yaml");
        let profile = profile_with(
            PermissionType::Storage,
            AuthorizationStatus::Limited,
            AuthorizationStatus::Authorized,
        );

        profile.save(&path).await.unwrap();
        let loaded = DeviceProfile::load(&path).await.unwrap();

        assert_eq!(
            loaded.permission(PermissionType::Storage).status,
            AuthorizationStatus::Limited
        );
        assert_eq!(loaded.location_prompt_delay_ms, 100);
    }

    #[tokio::test]
    async fn test_missing_profile_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeviceProfile::load(dir.path().join("absent.yaml")).await;
        assert!(matches!(result, Err(ProfileError::Io(_))));
    }
}
