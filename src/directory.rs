//! Users, the branch and week catalog, announcements and mitigation tasks.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{self, AuditEvent, ANNOUNCEMENT_ENTITY, MITIGATION_ENTITY, USER_ENTITY};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::models::{
    Actor, Announcement, AnnouncementKind, AnnouncementPriority, AuditAction, Branch,
    MitigationFilter, MitigationKind, MitigationPriority, MitigationStatus, MitigationTask, Role,
    User, Week,
};

fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(Error::Forbidden("admin role required".to_string()))
    }
}

fn ensure_staff(actor: &Actor) -> Result<()> {
    if matches!(actor.role, Role::Admin | Role::Faculty) {
        Ok(())
    } else {
        Err(Error::Forbidden("admin or faculty role required".to_string()))
    }
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    match value.map(|text| text.trim().to_string()) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(Error::Validation(format!("{name} is required"))),
    }
}

pub async fn list_users(store: &dyn Store, actor: &Actor) -> Result<Vec<User>> {
    ensure_admin(actor)?;
    store.list_users().await
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub branches: Option<Vec<String>>,
    pub active: Option<bool>,
}

pub async fn update_user(
    store: &dyn Store,
    id: Uuid,
    update: UserUpdate,
    actor: &Actor,
) -> Result<User> {
    ensure_admin(actor)?;
    let mut user = store
        .get_user(id)
        .await?
        .ok_or_else(|| Error::NotFound("user".to_string()))?;
    let before = json!({ "role": user.role, "branches": user.branches, "active": user.active });

    if let Some(role) = update.role {
        user.role = role;
    }
    if let Some(branches) = update.branches {
        user.branches = branches
            .iter()
            .map(|code| code.trim().to_uppercase())
            .filter(|code| !code.is_empty())
            .collect();
    }
    if let Some(active) = update.active {
        user.active = active;
    }
    store.upsert_user(&user).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::UpdateUserPermissions, USER_ENTITY, id.to_string()).change(
            before,
            json!({ "role": user.role, "branches": user.branches, "active": user.active }),
        ),
    )
    .await;

    Ok(user)
}

pub async fn list_branches(store: &dyn Store) -> Result<Vec<Branch>> {
    let mut branches = store.list_branches().await?;
    branches.sort_by(|a, b| a.branch_code.cmp(&b.branch_code));
    Ok(branches)
}

pub async fn list_weeks(store: &dyn Store) -> Result<Vec<Week>> {
    let mut weeks = store.list_weeks().await?;
    weeks.sort_by_key(|week| week.week_no);
    Ok(weeks)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAnnouncement {
    pub title: Option<String>,
    pub message: Option<String>,
    pub target_audience: Option<Vec<String>>,
    #[serde(rename = "type")]
    pub kind: Option<AnnouncementKind>,
    pub priority: Option<AnnouncementPriority>,
    pub expiry_date: Option<NaiveDate>,
}

/// Active announcements that have not expired, newest first.
pub async fn list_announcements(store: &dyn Store, today: NaiveDate) -> Result<Vec<Announcement>> {
    let announcements = store.list_active_announcements().await?;
    Ok(announcements
        .into_iter()
        .filter(|announcement| announcement.expiry_date.map_or(true, |expiry| expiry >= today))
        .collect())
}

pub async fn create_announcement(
    store: &dyn Store,
    new: NewAnnouncement,
    actor: &Actor,
) -> Result<Announcement> {
    ensure_staff(actor)?;
    let title = required(new.title, "title")?;
    let message = required(new.message, "message")?;

    let announcement = Announcement {
        id: Uuid::new_v4(),
        title,
        message,
        target_audience: new
            .target_audience
            .filter(|audience| !audience.is_empty())
            .unwrap_or_else(|| vec!["All".to_string()]),
        kind: new.kind.unwrap_or(AnnouncementKind::General),
        priority: new.priority.unwrap_or(AnnouncementPriority::Normal),
        created_by: actor.id.clone(),
        expiry_date: new.expiry_date,
        is_active: true,
        created_at: Utc::now(),
    };
    store.insert_announcement(&announcement).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(
            AuditAction::CreateAnnouncement,
            ANNOUNCEMENT_ENTITY,
            announcement.id.to_string(),
        )
        .details(json!({ "title": announcement.title, "priority": announcement.priority })),
    )
    .await;

    Ok(announcement)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewMitigation {
    pub branch_code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<MitigationKind>,
    pub description: Option<String>,
    pub priority: Option<MitigationPriority>,
    pub assigned_to: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MitigationUpdate {
    pub status: MitigationStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn list_mitigations(
    store: &dyn Store,
    filter: &MitigationFilter,
) -> Result<Vec<MitigationTask>> {
    store.list_mitigations(filter).await
}

pub async fn create_mitigation(
    store: &dyn Store,
    new: NewMitigation,
    actor: &Actor,
) -> Result<MitigationTask> {
    ensure_staff(actor)?;
    let branch_code = required(new.branch_code, "branch_code")?.to_uppercase();
    let kind = new
        .kind
        .ok_or_else(|| Error::Validation("type is required".to_string()))?;
    let description = required(new.description, "description")?;
    if !actor.can_access_branch(&branch_code) {
        return Err(Error::Forbidden(format!("unauthorized for branch {branch_code}")));
    }

    let now = Utc::now();
    let task = MitigationTask {
        id: Uuid::new_v4(),
        branch_code,
        kind,
        description,
        status: MitigationStatus::Pending,
        priority: new.priority.unwrap_or(MitigationPriority::Medium),
        assigned_to: new.assigned_to,
        created_by: actor.id.clone(),
        due_date: new.due_date,
        completed_at: None,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    };
    store.insert_mitigation(&task).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::CreateMitigation, MITIGATION_ENTITY, task.id.to_string())
            .details(json!({ "branch": task.branch_code, "type": task.kind })),
    )
    .await;

    Ok(task)
}

pub async fn update_mitigation(
    store: &dyn Store,
    id: Uuid,
    update: MitigationUpdate,
    actor: &Actor,
) -> Result<MitigationTask> {
    ensure_staff(actor)?;
    let mut task = store
        .get_mitigation(id)
        .await?
        .ok_or_else(|| Error::NotFound("mitigation task".to_string()))?;
    let old_status = task.status;

    let now = Utc::now();
    task.status = update.status;
    if let Some(notes) = update.notes {
        task.notes = Some(notes);
    }
    task.completed_at = match update.status {
        MitigationStatus::Completed => task.completed_at.or(Some(now)),
        _ => None,
    };
    task.updated_at = now;
    store.update_mitigation(&task).await?;

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::UpdateMitigationStatus, MITIGATION_ENTITY, id.to_string())
            .change(json!(old_status), json!(task.status)),
    )
    .await;

    Ok(task)
}
