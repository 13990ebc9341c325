//! Append-only audit trail.
//!
//! Writes never fail the request that triggered them: a store error is logged
//! and dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::db::Store;
use crate::error::Result;
use crate::models::{Actor, AuditAction, AuditEntry};

pub const REPORT_ENTITY: &str = "WeeklyReport";
pub const SUMMARY_ENTITY: &str = "AggregateSummary";
pub const MITIGATION_ENTITY: &str = "MitigationTask";
pub const ANNOUNCEMENT_ENTITY: &str = "Announcement";
pub const USER_ENTITY: &str = "User";
pub const INGESTION_ENTITY: &str = "IngestionLog";
pub const ATTENDANCE_ENTITY: &str = "AttendanceRecord";

pub const HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub details: Value,
}

impl AuditEvent {
    pub fn new(action: AuditAction, entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.into(),
            old_value: None,
            new_value: None,
            details: json!({}),
        }
    }

    pub fn change(mut self, old_value: Value, new_value: Value) -> Self {
        self.old_value = Some(old_value);
        self.new_value = Some(new_value);
        self
    }

    pub fn details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

pub fn entry_for(actor: &Actor, event: AuditEvent) -> AuditEntry {
    AuditEntry {
        id: Uuid::new_v4(),
        user_id: actor.id.clone(),
        user_name: actor.name.clone(),
        role: actor.role.as_str().to_string(),
        action: event.action.as_str().to_string(),
        entity_type: event.entity_type.to_string(),
        entity_id: event.entity_id,
        old_value: event.old_value,
        new_value: event.new_value,
        details: event.details,
        created_at: Utc::now(),
    }
}

pub async fn record(store: &dyn Store, actor: &Actor, event: AuditEvent) {
    let entry = entry_for(actor, event);
    match store.append_audit(&entry).await {
        Ok(()) => info!(
            "[AUDIT] {} on {} {} by {}",
            entry.action, entry.entity_type, entry.entity_id, entry.user_id
        ),
        Err(err) => error!(
            "[AUDIT FAILED] could not record {} on {} {}: {}",
            entry.action, entry.entity_type, entry.entity_id, err
        ),
    }
}

/// One row of a branch's edit history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user: String,
    pub field: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl From<AuditEntry> for HistoryItem {
    fn from(entry: AuditEntry) -> Self {
        let field = entry
            .details
            .get("field")
            .and_then(Value::as_str)
            .map(str::to_string);
        HistoryItem {
            id: entry.id,
            timestamp: entry.created_at,
            action: entry.action,
            user: entry.user_name.unwrap_or_else(|| "Unknown".to_string()),
            field,
            old_value: entry.old_value,
            new_value: entry.new_value,
        }
    }
}

pub async fn summary_history(store: &dyn Store, branch_code: &str) -> Result<Vec<HistoryItem>> {
    let entries = store
        .audit_history(SUMMARY_ENTITY, branch_code, HISTORY_LIMIT)
        .await?;
    Ok(entries.into_iter().map(HistoryItem::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn records_entries_newest_first() {
        let store = MemoryStore::new();
        let actor = Actor::system();

        record(
            &store,
            &actor,
            AuditEvent::new(AuditAction::ManualEdit, SUMMARY_ENTITY, "CSE-A")
                .change(json!(70.0), json!(80.0))
                .details(json!({ "field": "avg_attendance" })),
        )
        .await;
        record(
            &store,
            &actor,
            AuditEvent::new(AuditAction::RevertEdit, SUMMARY_ENTITY, "CSE-A")
                .change(json!(80.0), json!(70.0))
                .details(json!({ "field": "avg_attendance" })),
        )
        .await;
        record(
            &store,
            &actor,
            AuditEvent::new(AuditAction::ManualEdit, SUMMARY_ENTITY, "ECE-A"),
        )
        .await;

        let history = summary_history(&store, "CSE-A").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, "REVERT_EDIT");
        assert_eq!(history[0].field.as_deref(), Some("avg_attendance"));
        assert_eq!(history[0].user, "System");
        assert_eq!(history[1].old_value, Some(json!(70.0)));
    }
}
