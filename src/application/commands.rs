use crate::application::bootstrap::bootstrap_workspace;
use crate::application::session::Session;
use crate::application::sync_engine::SyncEngine;
use crate::domain::models::{EventDraft, EventOverrides, EventRecord};
use crate::domain::period::Period;
use crate::domain::stats::{
    distribution, duration_by_sport, select, sport_activities, totals, trend_series,
    AggregatedBucket, SportFilter, SportMinutes, SportShare, Totals,
};
use crate::infrastructure::config::read_api_url;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::event_store::{EventStore, InMemoryEventStore};
use crate::infrastructure::schedule_client::{ReqwestScheduleApiClient, ScheduleApiClient};
use chrono::{Local, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    api_client: Arc<ReqwestScheduleApiClient>,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let api_url = read_api_url(&bootstrap.config_dir)?;
        let api_client = Arc::new(ReqwestScheduleApiClient::new(&api_url)?);

        Ok(Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            api_client,
            runtime: Mutex::new(RuntimeState::default()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Default)]
struct RuntimeState {
    active: Option<Arc<SessionContext>>,
}

struct SessionContext {
    session: Session,
    event_store: Arc<InMemoryEventStore>,
    engine: SyncEngine<ReqwestScheduleApiClient, InMemoryEventStore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub period: String,
    pub sport: String,
    pub totals: Totals,
    pub trend: Vec<AggregatedBucket>,
    pub duration_by_sport: Vec<SportMinutes>,
    pub distribution: Vec<SportShare>,
}

pub fn sign_in_impl(state: &AppState, email: &str) -> Result<(), InfraError> {
    let session = Session::sign_in(email)?;
    let event_store = Arc::new(InMemoryEventStore::default());
    let engine = SyncEngine::new(
        Arc::clone(&state.api_client),
        Arc::clone(&event_store),
        session.clone(),
    );

    let mut runtime = lock_runtime(state)?;
    runtime.active = Some(Arc::new(SessionContext {
        session: session.clone(),
        event_store,
        engine,
    }));
    drop(runtime);

    state.log_info("sign_in", &format!("signed in owner={}", session.owner()));
    Ok(())
}

pub fn sign_out_impl(state: &AppState) -> Result<(), InfraError> {
    let mut runtime = lock_runtime(state)?;
    let had_session = runtime.active.take().is_some();
    drop(runtime);

    if had_session {
        state.log_info("sign_out", "session closed");
    }
    Ok(())
}

pub fn current_owner_impl(state: &AppState) -> Result<Option<String>, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime
        .active
        .as_ref()
        .map(|context| context.session.owner().to_string()))
}

pub async fn load_schedule_impl(state: &AppState) -> Result<usize, InfraError> {
    let context = active_context(state)?;
    let loaded = context.engine.reload().await?;
    state.log_info("load_schedule", &format!("loaded {loaded} events"));
    Ok(loaded)
}

pub fn list_events_impl(state: &AppState) -> Result<Vec<EventRecord>, InfraError> {
    let context = active_context(state)?;
    let mut events = context.event_store.snapshot()?;
    events.sort_by(|left, right| left.start.cmp(&right.start));
    Ok(events)
}

pub async fn create_event_impl(
    state: &AppState,
    draft: EventDraft,
) -> Result<EventRecord, InfraError> {
    let context = active_context(state)?;
    let created = context.engine.create(&draft).await?;
    state.log_info(
        "create_event",
        &format!("created event id={:?} title={}", created.id, created.title),
    );
    Ok(created)
}

pub async fn update_event_impl(
    state: &AppState,
    event_id: i64,
    draft: EventDraft,
) -> Result<EventRecord, InfraError> {
    draft.validate().map_err(InfraError::InvalidConfig)?;

    let context = active_context(state)?;
    let existing = context
        .event_store
        .get_by_id(event_id)?
        .ok_or_else(|| InfraError::InvalidConfig(format!("event not found: {event_id}")))?;

    let updated = context
        .engine
        .update(&existing, &EventOverrides::from_draft(&draft))
        .await?;
    state.log_info("update_event", &format!("updated event id={event_id}"));
    Ok(updated)
}

pub async fn delete_event_impl(state: &AppState, event_id: i64) -> Result<(), InfraError> {
    let context = active_context(state)?;
    context.engine.remove(event_id).await?;
    state.log_info("delete_event", &format!("deleted event id={event_id}"));
    Ok(())
}

/// Shared drag/resize entry point: both gestures reduce to new start and
/// end timestamps for one persisted event.
pub async fn reschedule_event_impl(
    state: &AppState,
    event_id: i64,
    start: &str,
    end: &str,
) -> Result<(), InfraError> {
    let new_start = parse_datetime_input(start, "start")?;
    let new_end = parse_datetime_input(end, "end")?;

    let context = active_context(state)?;
    let existing = context
        .event_store
        .get_by_id(event_id)?
        .ok_or_else(|| InfraError::InvalidConfig(format!("event not found: {event_id}")))?;

    context
        .engine
        .move_or_resize(&existing, new_start, new_end)
        .await?;
    state.log_info(
        "reschedule_event",
        &format!("moved event id={event_id} start={new_start} end={new_end}"),
    );
    Ok(())
}

pub async fn attach_file_impl(
    state: &AppState,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<String, InfraError> {
    let file_name = file_name.trim();
    if file_name.is_empty() {
        return Err(InfraError::InvalidConfig(
            "file name must not be empty".to_string(),
        ));
    }

    let stored_path = state.api_client.upload_file(file_name, bytes).await?;
    state.log_info(
        "attach_file",
        &format!("uploaded {file_name} to {stored_path}"),
    );
    Ok(stored_path)
}

pub fn dashboard_impl(
    state: &AppState,
    period_key: &str,
    sport_key: &str,
) -> Result<DashboardResponse, InfraError> {
    dashboard_at(state, period_key, sport_key, Local::now().naive_local())
}

fn dashboard_at(
    state: &AppState,
    period_key: &str,
    sport_key: &str,
    now: NaiveDateTime,
) -> Result<DashboardResponse, InfraError> {
    let period = Period::from_key(period_key)
        .ok_or_else(|| InfraError::InvalidConfig(format!("unknown period key: {period_key}")))?;
    let filter = SportFilter::from_key(sport_key)
        .ok_or_else(|| InfraError::InvalidConfig(format!("unknown sport key: {sport_key}")))?;

    let context = active_context(state)?;
    let snapshot = context.event_store.snapshot()?;
    let activities = sport_activities(&snapshot);

    // The interval is anchored on "now" and must be re-resolved on every
    // selection change, so it is never cached on the state.
    let interval = period.resolve(now);
    let selected = select(&activities, interval.as_ref(), filter);

    Ok(DashboardResponse {
        period: period.as_key().to_string(),
        sport: sport_key.trim().to_ascii_uppercase(),
        totals: totals(&selected),
        trend: trend_series(&selected, period, interval.as_ref()),
        duration_by_sport: duration_by_sport(&selected),
        distribution: distribution(&selected),
    })
}

fn active_context(state: &AppState) -> Result<Arc<SessionContext>, InfraError> {
    let runtime = lock_runtime(state)?;
    runtime
        .active
        .as_ref()
        .map(Arc::clone)
        .ok_or_else(|| InfraError::InvalidConfig("no user is signed in".to_string()))
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn parse_datetime_input(raw: &str, field_name: &str) -> Result<NaiveDateTime, InfraError> {
    let trimmed = raw.trim();
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(parsed);
        }
    }
    Err(InfraError::InvalidConfig(format!(
        "invalid {field_name} timestamp '{raw}'"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicU64, Ordering};

    static WORKSPACE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

    struct TempWorkspace {
        root: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = WORKSPACE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
            let root = std::env::temp_dir().join(format!(
                "weekfitter-test-{}-{sequence}",
                std::process::id()
            ));
            fs::create_dir_all(&root).expect("create temp workspace");
            Self { root }
        }

        fn app_state(&self) -> AppState {
            AppState::new(self.root.clone()).expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    fn fixed_time(value: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").expect("valid datetime")
    }

    #[test]
    fn bootstrap_creates_config_and_logs_directories() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(state.config_dir().join("app.json").exists());
        assert!(workspace.root.join("logs").exists());
    }

    #[test]
    fn commands_require_a_signed_in_session() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert!(list_events_impl(&state).is_err());
        assert!(dashboard_impl(&state, "week", "ALL").is_err());
        assert_eq!(current_owner_impl(&state).expect("owner"), None);
    }

    #[test]
    fn sign_in_and_out_toggle_the_session() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        sign_in_impl(&state, "runner@example.com").expect("sign in");
        assert_eq!(
            current_owner_impl(&state).expect("owner"),
            Some("runner@example.com".to_string())
        );
        assert!(list_events_impl(&state).expect("list").is_empty());

        sign_out_impl(&state).expect("sign out");
        assert_eq!(current_owner_impl(&state).expect("owner"), None);
        assert!(list_events_impl(&state).is_err());
    }

    #[test]
    fn sign_in_rejects_malformed_addresses() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(sign_in_impl(&state, "not-an-address").is_err());
        assert_eq!(current_owner_impl(&state).expect("owner"), None);
    }

    #[test]
    fn dashboard_rejects_unknown_keys() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        sign_in_impl(&state, "runner@example.com").expect("sign in");

        assert!(dashboard_impl(&state, "fortnight", "ALL").is_err());
        assert!(dashboard_impl(&state, "week", "CHESS").is_err());
    }

    #[test]
    fn dashboard_on_empty_schedule_reports_zeros() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        sign_in_impl(&state, "runner@example.com").expect("sign in");

        for period_key in ["day", "week", "month", "year", "all"] {
            let response = dashboard_at(&state, period_key, "ALL", fixed_time("2024-06-05T12:00"))
                .expect("dashboard");
            assert_eq!(response.totals.activities, 0);
            assert_eq!(response.totals.distance_km, 0.0);
            assert!(response.trend.is_empty());
            assert_eq!(response.duration_by_sport.len(), 4);
            assert!(response.distribution.iter().all(|share| share.percent == 0));
        }
    }

    #[tokio::test]
    async fn reschedule_validates_input_before_any_request() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        sign_in_impl(&state, "runner@example.com").expect("sign in");

        let bad_timestamp =
            reschedule_event_impl(&state, 1, "next tuesday", "2024-06-03T09:30").await;
        assert!(bad_timestamp.is_err());

        let unknown_event =
            reschedule_event_impl(&state, 1, "2024-06-03T09:00", "2024-06-03T09:30").await;
        assert!(unknown_event.is_err());
    }

    #[tokio::test]
    async fn attach_file_rejects_blank_names() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert!(attach_file_impl(&state, "  ", Vec::new()).await.is_err());
    }

    #[test]
    fn command_errors_are_appended_to_the_log() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let message = state.command_error(
            "load_schedule",
            &InfraError::InvalidConfig("no user is signed in".to_string()),
        );
        assert!(message.contains("no user is signed in"));

        let log = fs::read_to_string(workspace.root.join("logs").join("commands.log"))
            .expect("log file exists");
        assert!(log.contains("\"command\":\"load_schedule\""));
        assert!(log.contains("\"level\":\"error\""));
    }
}
