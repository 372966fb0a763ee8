pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{
    attach_file_impl, create_event_impl, current_owner_impl, dashboard_impl, delete_event_impl,
    list_events_impl, load_schedule_impl, reschedule_event_impl, sign_in_impl, sign_out_impl,
    update_event_impl, AppState, DashboardResponse,
};
pub use application::session::Session;
pub use application::sync_engine::{RetryPolicy, SyncEngine};
pub use domain::models::{
    Category, EventDetail, EventDraft, EventOverrides, EventRecord, SportType,
};
pub use domain::period::{DateInterval, Period};
pub use domain::stats::{
    AggregatedBucket, SportActivity, SportFilter, SportMinutes, SportShare, Totals,
};
pub use infrastructure::error::InfraError;
pub use infrastructure::event_store::{EventStore, InMemoryEventStore};
pub use infrastructure::schedule_client::{ReqwestScheduleApiClient, ScheduleApiClient};
