//! HTTP API handlers

pub mod actor;
pub mod analytics;
pub mod announcements;
pub mod attendance;
pub mod audit;
pub mod catalog;
pub mod extract;
pub mod health;
pub mod ingest;
pub mod mitigation;
pub mod reports;
pub mod risk;
pub mod summary;
pub mod users;

pub use actor::CurrentActor;
pub use analytics::{get_analytics, get_branch_analytics};
pub use announcements::{create_announcement, list_announcements};
pub use attendance::{list_attendance, save_attendance};
pub use audit::get_audit_history;
pub use catalog::{list_branches, list_weeks};
pub use extract::{JsonBody, PathParams, QueryParams};
pub use health::health_routes;
pub use ingest::ingest_sheet;
pub use mitigation::{create_mitigation, list_mitigations, update_mitigation};
pub use reports::{bulk_save_reports, list_reports, reopen_report, save_report};
pub use risk::get_risk_board;
pub use summary::{get_summaries, refresh_summaries, revert_summary, update_summary};
pub use users::{list_users, update_user};
