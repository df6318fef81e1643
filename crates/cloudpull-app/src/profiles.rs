//! Remote profile set, selection and creation.

use std::sync::Arc;

use cloudpull_core::{
    ErrorKind, ProfileSelection, ProfileService, RemoteProfile, SyncError, SyncResult, classify,
};
use cloudpull_events::{Event, EventBus};
use tracing::{info, warn};

/// Owns the known profiles and the current selection.
pub struct ProfileManager {
    service: Arc<dyn ProfileService>,
    events: EventBus,
    default_id: String,
    profiles: Vec<RemoteProfile>,
    selection: ProfileSelection,
}

impl ProfileManager {
    /// Start with an empty profile set and `default_id` selected.
    #[must_use]
    pub fn new(service: Arc<dyn ProfileService>, events: EventBus, default_id: &str) -> Self {
        Self {
            service,
            events,
            default_id: default_id.to_string(),
            profiles: Vec::new(),
            selection: ProfileSelection::Selected(default_id.to_string()),
        }
    }

    /// Re-list profiles from the service and reconcile the selection.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Service` when the service fails; the current set is kept.
    pub async fn refresh(&mut self) -> SyncResult<Vec<RemoteProfile>> {
        let ids = self.service.list_profiles().await.map_err(|err| {
            let message = classify(ErrorKind::Listing, &format!("{err:#}"));
            warn!(error = %err, "listing remote profiles failed");
            SyncError::Service { message }
        })?;
        let mut profiles: Vec<RemoteProfile> = ids.into_iter().map(RemoteProfile::new).collect();
        profiles.sort();
        profiles.dedup();
        self.set_profiles(profiles);
        Ok(self.profiles.clone())
    }

    /// Set the selection without checking it against the profile set.
    pub fn select(&mut self, selection: ProfileSelection) {
        if self.selection != selection {
            self.selection = selection;
            self.publish_selection();
        }
    }

    /// Authorize a new profile, refresh, and select it.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Auth` when the flow fails; the selection is untouched.
    pub async fn create_profile(&mut self) -> SyncResult<RemoteProfile> {
        let id = self.service.create_profile().await.map_err(|err| {
            let message = classify(ErrorKind::Authorization, &format!("{err:#}"));
            warn!(error = %err, "remote profile authorization failed");
            SyncError::Auth { message }
        })?;
        info!(profile = %id, "remote profile created");

        if let Err(err) = self.refresh().await {
            warn!(error = %err, "refresh after profile creation failed");
        }
        let profile = RemoteProfile::new(id.clone());
        if !self.profiles.contains(&profile) {
            let mut profiles = self.profiles.clone();
            profiles.push(profile.clone());
            profiles.sort();
            self.set_profiles(profiles);
        }
        self.select(ProfileSelection::Selected(id));
        Ok(profile)
    }

    /// True iff an existing profile id is selected.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.selected_id().is_some_and(|id| !id.trim().is_empty())
    }

    /// Selected profile id, `None` for the "create new" choice.
    #[must_use]
    pub fn selected_id(&self) -> Option<&str> {
        self.selection.id()
    }

    /// Current selection.
    #[must_use]
    pub const fn selection(&self) -> &ProfileSelection {
        &self.selection
    }

    /// Known profiles, sorted.
    #[must_use]
    pub fn profiles(&self) -> &[RemoteProfile] {
        &self.profiles
    }

    fn set_profiles(&mut self, profiles: Vec<RemoteProfile>) {
        self.profiles = profiles;
        let _ = self.events.publish(Event::ProfilesRefreshed {
            profiles: self.profiles.iter().map(|profile| profile.id.clone()).collect(),
        });
        let reconciled = self.reconcile();
        self.select(reconciled);
    }

    /// Keep "create new", then a still-present id, then the default if present,
    /// falling back to "create new".
    fn reconcile(&self) -> ProfileSelection {
        let present = |id: &str| self.profiles.iter().any(|profile| profile.id == id);
        match &self.selection {
            ProfileSelection::CreateNew => ProfileSelection::CreateNew,
            ProfileSelection::Selected(id) if present(id) => self.selection.clone(),
            ProfileSelection::Selected(_) if present(&self.default_id) => {
                ProfileSelection::Selected(self.default_id.clone())
            }
            ProfileSelection::Selected(_) => ProfileSelection::CreateNew,
        }
    }

    fn publish_selection(&self) {
        let _ = self.events.publish(Event::ProfileSelected {
            profile: self.selected_id().map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, bail};
    use async_trait::async_trait;
    use std::sync::Mutex;

    const DEFAULT: &str = "gdrive_default";

    #[derive(Default)]
    struct ScriptedService {
        listings: Mutex<Vec<anyhow::Result<Vec<String>>>>,
        created: Mutex<Option<anyhow::Result<String>>>,
    }

    impl ScriptedService {
        fn listing(self, ids: &[&str]) -> Self {
            self.listings
                .lock()
                .expect("lock")
                .push(Ok(ids.iter().map(ToString::to_string).collect()));
            self
        }

        fn failing_listing(self, message: &str) -> Self {
            self.listings
                .lock()
                .expect("lock")
                .push(Err(anyhow!(message.to_string())));
            self
        }

        fn creates(self, result: anyhow::Result<String>) -> Self {
            *self.created.lock().expect("lock") = Some(result);
            self
        }
    }

    #[async_trait]
    impl ProfileService for ScriptedService {
        async fn list_profiles(&self) -> anyhow::Result<Vec<String>> {
            let mut listings = self.listings.lock().expect("lock");
            if listings.is_empty() {
                bail!("no scripted listing");
            }
            listings.remove(0)
        }

        async fn create_profile(&self) -> anyhow::Result<String> {
            self.created
                .lock()
                .expect("lock")
                .take()
                .unwrap_or_else(|| Err(anyhow!("no scripted creation")))
        }
    }

    fn manager(service: ScriptedService) -> ProfileManager {
        ProfileManager::new(Arc::new(service), EventBus::new(), DEFAULT)
    }

    #[tokio::test]
    async fn initial_selection_is_default() {
        let manager = manager(ScriptedService::default());
        assert_eq!(manager.selected_id(), Some(DEFAULT));
        assert!(manager.is_valid());
    }

    #[tokio::test]
    async fn refresh_sorts_and_keeps_present_selection() {
        let service = ScriptedService::default()
            .listing(&["zeta", "alpha"])
            .listing(&["alpha", "zeta"]);
        let mut manager = manager(service);
        manager.refresh().await.expect("first refresh");
        // default missing, nothing else selected: falls back to create-new
        assert_eq!(manager.selection(), &ProfileSelection::CreateNew);

        manager.select(ProfileSelection::Selected("zeta".into()));
        let profiles = manager.refresh().await.expect("second refresh");
        assert_eq!(
            profiles,
            vec![RemoteProfile::new("alpha"), RemoteProfile::new("zeta")]
        );
        assert_eq!(manager.selected_id(), Some("zeta"));
    }

    #[tokio::test]
    async fn vanished_selection_falls_back_to_default() {
        let mut manager = manager(ScriptedService::default().listing(&["a", DEFAULT]));
        manager.select(ProfileSelection::Selected("gone".into()));
        manager.refresh().await.expect("refresh");
        assert_eq!(manager.selected_id(), Some(DEFAULT));
    }

    #[tokio::test]
    async fn vanished_selection_without_default_is_create_new() {
        let mut manager = manager(ScriptedService::default().listing(&["a"]));
        manager.select(ProfileSelection::Selected("gone".into()));
        manager.refresh().await.expect("refresh");
        assert_eq!(manager.selection(), &ProfileSelection::CreateNew);
        assert!(!manager.is_valid());
    }

    #[tokio::test]
    async fn explicit_create_new_is_kept() {
        let mut manager = manager(ScriptedService::default().listing(&[DEFAULT]));
        manager.select(ProfileSelection::CreateNew);
        manager.refresh().await.expect("refresh");
        assert_eq!(manager.selection(), &ProfileSelection::CreateNew);
    }

    #[tokio::test]
    async fn listing_failure_is_classified_and_keeps_set() {
        let mut manager = manager(
            ScriptedService::default()
                .listing(&[DEFAULT])
                .failing_listing("error sending request for url"),
        );
        manager.refresh().await.expect("refresh");
        let err = manager.refresh().await.expect_err("second refresh fails");
        assert_eq!(
            err,
            SyncError::Service {
                message: "Cannot reach the transfer service. Make sure rclone is running."
                    .into()
            }
        );
        assert_eq!(manager.profiles(), &[RemoteProfile::new(DEFAULT)]);
        assert_eq!(manager.selected_id(), Some(DEFAULT));
    }

    #[tokio::test]
    async fn created_profile_is_selected() {
        let mut manager = manager(
            ScriptedService::default()
                .listing(&[])
                .listing(&["fresh"])
                .creates(Ok("fresh".into())),
        );
        manager.refresh().await.expect("refresh");
        assert_eq!(manager.selection(), &ProfileSelection::CreateNew);

        let created = manager.create_profile().await.expect("create");
        assert_eq!(created, RemoteProfile::new("fresh"));
        assert_eq!(manager.selected_id(), Some("fresh"));
        assert_eq!(manager.profiles(), &[RemoteProfile::new("fresh")]);
    }

    #[tokio::test]
    async fn failed_creation_keeps_selection() {
        let mut manager = manager(
            ScriptedService::default().creates(Err(anyhow!("authorize: timeout waiting for code"))),
        );
        manager.select(ProfileSelection::Selected("other".into()));
        let err = manager.create_profile().await.expect_err("creation fails");
        assert_eq!(
            err,
            SyncError::Auth {
                message: "Authorization timed out. Please try again.".into()
            }
        );
        assert_eq!(manager.selected_id(), Some("other"));
    }

    #[tokio::test]
    async fn selection_changes_are_published() {
        let events = EventBus::new();
        let mut stream = events.subscribe(None);
        let mut manager =
            ProfileManager::new(Arc::new(ScriptedService::default()), events, DEFAULT);
        manager.select(ProfileSelection::CreateNew);
        manager.select(ProfileSelection::CreateNew);

        let published = stream.drain_ready();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].event,
            Event::ProfileSelected { profile: None }
        );
    }
}
