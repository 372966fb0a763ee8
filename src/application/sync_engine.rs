use crate::application::session::Session;
use crate::domain::models::{EventDraft, EventOverrides, EventRecord};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_mapper::{build_payload, decode_wire_event, WireEvent};
use crate::infrastructure::event_store::EventStore;
use crate::infrastructure::schedule_client::ScheduleApiClient;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::time::{sleep, Duration as TokioDuration};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

/// Orchestrates schedule mutations against the collaborator. Every
/// mutation reconciles through a full reload; drags and resizes mutate the
/// store first so the new placement is visible before the network settles.
pub struct SyncEngine<C, S>
where
    C: ScheduleApiClient,
    S: EventStore,
{
    api_client: Arc<C>,
    event_store: Arc<S>,
    session: Session,
    retry_policy: RetryPolicy,
}

impl<C, S> SyncEngine<C, S>
where
    C: ScheduleApiClient,
    S: EventStore,
{
    pub fn new(api_client: Arc<C>, event_store: Arc<S>, session: Session) -> Self {
        Self {
            api_client,
            event_store,
            session,
            retry_policy: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Replaces the store with the collaborator's current schedule.
    /// Undecodable records are dropped; a transport failure leaves the
    /// store as it was.
    pub async fn reload(&self) -> Result<usize, InfraError> {
        let wire_events = self.list_events_with_retry().await?;
        let records: Vec<EventRecord> =
            wire_events.iter().filter_map(decode_wire_event).collect();
        let count = records.len();
        self.event_store.replace(records)?;
        Ok(count)
    }

    pub async fn create(&self, draft: &EventDraft) -> Result<EventRecord, InfraError> {
        draft.validate().map_err(InfraError::InvalidConfig)?;

        let record = draft.to_record(None);
        let overrides = EventOverrides {
            notifications: Some(draft.notifications.clone()),
            ..EventOverrides::default()
        };
        let payload = build_payload(&record, &overrides);

        let created = self
            .api_client
            .create_event(self.session.owner(), &payload)
            .await?;
        let created = decode_wire_event(&created).ok_or_else(|| {
            InfraError::Api("event create response could not be decoded".to_string())
        })?;

        self.reload().await?;
        Ok(created)
    }

    pub async fn update(
        &self,
        existing: &EventRecord,
        overrides: &EventOverrides,
    ) -> Result<EventRecord, InfraError> {
        let event_id = existing.id.ok_or_else(|| {
            InfraError::InvalidConfig("cannot update an event that has no id".to_string())
        })?;
        let payload = build_payload(existing, overrides);

        let updated = self
            .api_client
            .update_event(self.session.owner(), event_id, &payload)
            .await?;
        let updated = decode_wire_event(&updated).ok_or_else(|| {
            InfraError::Api("event update response could not be decoded".to_string())
        })?;

        self.reload().await?;
        Ok(updated)
    }

    /// The delete outcome is not reflected in the store directly: the
    /// reload afterwards carries whatever the collaborator now holds.
    pub async fn remove(&self, event_id: i64) -> Result<(), InfraError> {
        let outcome = self.api_client.delete_event(event_id).await;
        let reload_outcome = self.reload().await;
        outcome?;
        reload_outcome?;
        Ok(())
    }

    /// Drag/resize path. The store is mutated before the request is sent,
    /// the payload is built from the pre-move record, and the reload runs
    /// whether the collaborator accepted the move or not — a rejected move
    /// reverts silently to server truth.
    pub async fn move_or_resize(
        &self,
        event: &EventRecord,
        new_start: NaiveDateTime,
        new_end: NaiveDateTime,
    ) -> Result<(), InfraError> {
        let event_id = event.id.ok_or_else(|| {
            InfraError::InvalidConfig("cannot move an event that has no id".to_string())
        })?;

        self.event_store.set_times(event_id, new_start, new_end)?;

        let payload = build_payload(event, &EventOverrides::times(new_start, new_end));
        let outcome = self
            .api_client
            .update_event(self.session.owner(), event_id, &payload)
            .await;
        let reload_outcome = self.reload().await;

        outcome?;
        reload_outcome?;
        Ok(())
    }

    async fn list_events_with_retry(&self) -> Result<Vec<WireEvent>, InfraError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.api_client.list_events(self.session.owner()).await {
                Ok(events) => return Ok(events),
                Err(error) if self.should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(attempt as u32));
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn should_retry(&self, error: &InfraError) -> bool {
        match error {
            InfraError::Api(message) => {
                let message = message.to_ascii_lowercase();
                message.contains("network error")
                    || message.contains("timeout")
                    || message.contains("timed out")
                    || message.contains("temporarily unavailable")
                    || message.contains("connection reset")
            }
            _ => false,
        }
    }
}
