//! # Client Session
//!
//! One application session: a single transport, gateway, recorder and
//! reconciler shared by every view. Nothing here is process-global; dropping
//! the session drops its in-memory fallback data and writer tasks.

use serde::Serialize;
use shared::LOGGED_IN_KEY;
use std::sync::Arc;
use tracing::info;

use crate::config::ClientConfig;
use crate::error::{ApiError, StorageResult};
use crate::services::{
    ApiClient, HistoryLog, HistoryRecorder, Notifier, RefreshBus, RemoteStore, StorageGateway,
    StudentActions, StudentDirectory,
};
use crate::sync::{CollectionWatch, Reconciler};
use crate::validation::{PhoneCheckCache, PhoneFieldSession};

pub struct ClientSession {
    config: ClientConfig,
    gateway: Arc<StorageGateway>,
    notifier: Notifier,
    refresh: RefreshBus,
    history: HistoryRecorder,
    phone_checks: Arc<PhoneCheckCache>,
    students: StudentActions,
    reconciler: Reconciler,
}

impl ClientSession {
    /// Build a session talking to the API at `config.base_url`
    pub fn connect(config: ClientConfig) -> Result<Self, ApiError> {
        let api = Arc::new(ApiClient::new(&config)?);
        info!("Client session connected to {}", api.base_url());
        Ok(Self::with_backends(config, api.clone(), api.clone(), api))
    }

    /// Build a session over explicit remote collaborators
    pub fn with_backends(
        config: ClientConfig,
        remote: Arc<dyn RemoteStore>,
        directory: Arc<dyn StudentDirectory>,
        history_log: Arc<dyn HistoryLog>,
    ) -> Self {
        let notifier = Notifier::new(config.notification_capacity);
        let refresh = RefreshBus::new(config.notification_capacity);
        let gateway = Arc::new(StorageGateway::new(remote));
        let history = HistoryRecorder::new(history_log, refresh.clone(), notifier.clone());
        let phone_checks = Arc::new(PhoneCheckCache::new(directory.clone(), config.phone_check_ttl()));
        let students = StudentActions::new(directory, history.clone(), refresh.clone(), phone_checks.clone());
        let reconciler = Reconciler::new(gateway.clone(), notifier.clone());

        Self {
            config,
            gateway,
            notifier,
            refresh,
            history,
            phone_checks,
            students,
            reconciler,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<StorageGateway> {
        &self.gateway
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn refresh(&self) -> &RefreshBus {
        &self.refresh
    }

    pub fn history(&self) -> &HistoryRecorder {
        &self.history
    }

    pub fn students(&self) -> &StudentActions {
        &self.students
    }

    pub fn phone_checks(&self) -> &Arc<PhoneCheckCache> {
        &self.phone_checks
    }

    /// Validation state for one phone input; `editing_id` is the student being edited
    pub fn phone_field(&self, editing_id: Option<i64>) -> PhoneFieldSession {
        PhoneFieldSession::new(self.phone_checks.clone(), editing_id)
    }

    pub fn watch<T: Serialize>(&self, key: &str) -> CollectionWatch<T> {
        self.reconciler.watch(key)
    }

    pub async fn set_logged_in(&self, logged_in: bool) -> StorageResult {
        self.gateway.write(LOGGED_IN_KEY, &logged_in).await
    }

    pub async fn is_logged_in(&self) -> bool {
        self.gateway.read(LOGGED_IN_KEY, false).await
    }
}
