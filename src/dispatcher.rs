use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::AuditRecorder;
use crate::bootstrap::{BootstrapReport, Bootstrapper};
use crate::classifier::{classify, WebhookEvent};
use crate::config::Config;
use crate::error::HookError;
use crate::notifier::Notifier;
use crate::types::{ActionKind, NotificationRecord, RepositoryBootstrapRequest, WebhookDelivery};
use crate::verification::verify_delivery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Event type this service does not act on.
    Ignored { event_type: String },
    /// Recognised event with nothing to report.
    NoOp,
    Handled {
        action: ActionKind,
        notified: bool,
        audit_id: Option<String>,
        bootstrap: Option<BootstrapReport>,
    },
}

/// Holds only immutable configuration and shared collaborator handles, so
/// one instance serves concurrent deliveries.
pub struct Dispatcher {
    config: Arc<Config>,
    notifier: Notifier,
    recorder: Arc<AuditRecorder>,
    bootstrapper: Bootstrapper,
}

impl Dispatcher {
    pub fn new(
        config: Arc<Config>,
        notifier: Notifier,
        recorder: Arc<AuditRecorder>,
        bootstrapper: Bootstrapper,
    ) -> Self {
        Self {
            config,
            notifier,
            recorder,
            bootstrapper,
        }
    }

    pub fn recorder(&self) -> &Arc<AuditRecorder> {
        &self.recorder
    }

    pub async fn handle(&self, delivery: WebhookDelivery) -> Result<DispatchOutcome, HookError> {
        let delivery_id = delivery.delivery_id.as_deref().unwrap_or("-");

        if let Err(e) = verify_delivery(&self.config.webhook_secret_key, &delivery) {
            warn!(delivery_id, event_type = %delivery.event_type, "rejecting delivery: invalid signature");
            return Err(e);
        }
        debug!(delivery_id, event_type = %delivery.event_type, "delivery verified");

        let event = classify(&delivery.event_type, &delivery.body).map_err(|e| {
            warn!(delivery_id, error = %e, "rejecting delivery: payload unparseable");
            e
        })?;

        match event {
            WebhookEvent::Unknown { raw_type_label } => {
                info!(delivery_id, event_type = %raw_type_label, "unknown event type, ignoring");
                Ok(DispatchOutcome::Ignored {
                    event_type: raw_type_label,
                })
            }
            WebhookEvent::NoOp => {
                debug!(delivery_id, "push without commits, nothing to report");
                Ok(DispatchOutcome::NoOp)
            }
            WebhookEvent::Push(push) => {
                let record = push.notification(&self.config.org_avatar_url);
                Ok(self.report(delivery_id, record, None).await)
            }
            WebhookEvent::Repository(repo) => {
                let record = repo.notification();
                let bootstrap = repo.is_creation().then(|| {
                    repo.bootstrap_request(&self.config.admin_email, &self.config.issue_assignee)
                });
                Ok(self.report(delivery_id, record, bootstrap).await)
            }
        }
    }

    /// Notify and audit from the same record, then bootstrap if asked.
    async fn report(
        &self,
        delivery_id: &str,
        record: NotificationRecord,
        bootstrap: Option<RepositoryBootstrapRequest>,
    ) -> DispatchOutcome {
        info!(
            delivery_id,
            org = %record.organization,
            repo = %record.repository_full_name,
            actor = %record.actor_name,
            action = %record.summary.kind,
            "handling event"
        );

        let notified = self.notifier.notify(&record).await;
        let audit_id = self.recorder.record(&record).await;
        let bootstrap = match bootstrap {
            Some(request) => Some(self.bootstrapper.run(&request).await),
            None => None,
        };

        DispatchOutcome::Handled {
            action: record.summary.kind,
            notified,
            audit_id,
            bootstrap,
        }
    }
}

#[cfg(test)]
pub(crate) mod harness {
    use super::*;
    use crate::bootstrap::fake::FakeHost;
    use crate::config::test_config;
    use crate::notifier::fake::RecordingTransport;
    use crate::store::{AuditStore, InMemoryAuditStore};
    use crate::verification::sign_sha256;
    use axum::body::Bytes;

    pub struct Harness {
        pub dispatcher: Arc<Dispatcher>,
        pub chat: Arc<RecordingTransport>,
        pub store: Arc<dyn AuditStore>,
        pub host: Arc<FakeHost>,
    }

    pub fn harness_with(chat: RecordingTransport, store: Arc<dyn AuditStore>, host: FakeHost) -> Harness {
        let config = Arc::new(test_config());
        let chat = Arc::new(chat);
        let host = Arc::new(host);
        let notifier = Notifier::new(
            chat.clone(),
            config.webhook_slack_url.clone(),
            config.footer_slack.clone(),
        );
        let recorder = Arc::new(AuditRecorder::new(store.clone()));
        let bootstrapper = Bootstrapper::new(
            host.clone(),
            config.default_branch.clone(),
            config.readme_content.clone(),
        );
        Harness {
            dispatcher: Arc::new(Dispatcher::new(config, notifier, recorder, bootstrapper)),
            chat,
            store,
            host,
        }
    }

    pub fn harness() -> Harness {
        harness_with(
            RecordingTransport::default(),
            Arc::new(InMemoryAuditStore::new()),
            FakeHost::default(),
        )
    }

    pub fn signed(event_type: &str, body: &serde_json::Value) -> WebhookDelivery {
        let body = serde_json::to_vec(body).unwrap();
        WebhookDelivery {
            event_type: event_type.to_string(),
            signature_256: Some(sign_sha256(&test_config().webhook_secret_key, &body)),
            signature_sha1: None,
            delivery_id: Some("d-1".to_string()),
            body: Bytes::from(body),
        }
    }
}
