use crate::domain::models::EventRecord;
use crate::infrastructure::error::InfraError;
use chrono::NaiveDateTime;
use std::sync::Mutex;

/// Current schedule of the signed-in user. Reconciliation after any
/// mutation is a whole-list `replace`; there is no incremental merge.
pub trait EventStore: Send + Sync {
    fn snapshot(&self) -> Result<Vec<EventRecord>, InfraError>;
    fn get_by_id(&self, event_id: i64) -> Result<Option<EventRecord>, InfraError>;
    fn replace(&self, events: Vec<EventRecord>) -> Result<(), InfraError>;
    fn set_times(
        &self,
        event_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, InfraError>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    events: Mutex<Vec<EventRecord>>,
}

impl InMemoryEventStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<EventRecord>>, InfraError> {
        self.events
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("event store lock poisoned: {error}")))
    }
}

impl EventStore for InMemoryEventStore {
    fn snapshot(&self) -> Result<Vec<EventRecord>, InfraError> {
        Ok(self.lock()?.clone())
    }

    fn get_by_id(&self, event_id: i64) -> Result<Option<EventRecord>, InfraError> {
        let events = self.lock()?;
        Ok(events.iter().find(|event| event.id == Some(event_id)).cloned())
    }

    fn replace(&self, events: Vec<EventRecord>) -> Result<(), InfraError> {
        *self.lock()? = events;
        Ok(())
    }

    fn set_times(
        &self,
        event_id: i64,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<bool, InfraError> {
        let mut events = self.lock()?;
        let Some(event) = events.iter_mut().find(|event| event.id == Some(event_id)) else {
            return Ok(false);
        };
        event.start = start;
        event.end = end;
        Ok(true)
    }
}
