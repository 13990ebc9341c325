use anyhow::Context;
use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use super::Store;
use crate::aggregation;
use crate::models::{Actor, Branch, ReportInput, ReportStatus, Role, User, Week};
use crate::reports;

/// Loads a small department: five branches, six weeks, two staff accounts and
/// four finalized weeks of reports, then refreshes summaries.
pub async fn seed(store: &dyn Store) -> anyhow::Result<()> {
    let branches = [
        ("CSE-A", "Computer Science A", "CSE", 64),
        ("CSE-B", "Computer Science B", "CSE", 62),
        ("ECE-A", "Electronics A", "ECE", 58),
        ("MECH", "Mechanical", "MECH", 55),
        ("CIVIL", "Civil", "CIVIL", 48),
    ];
    for (code, name, department, strength) in branches {
        store
            .upsert_branch(&Branch {
                branch_code: code.to_string(),
                branch_name: name.to_string(),
                department: department.to_string(),
                current_strength: strength,
            })
            .await?;
    }

    let first_monday = NaiveDate::from_ymd_opt(2025, 1, 6).context("invalid date")?;
    for week_no in 1..=6 {
        let start_date = first_monday + Duration::weeks(i64::from(week_no - 1));
        store
            .upsert_week(&Week {
                week_no,
                start_date,
                end_date: start_date + Duration::days(5),
                label: format!("Week {week_no}"),
            })
            .await?;
    }

    let users = [
        (
            Uuid::parse_str("6b0f7c3e-1d2a-4c55-9a1e-2f4c8d9b7a10")?,
            "Anita Rao",
            "anita.rao@college.edu",
            Role::Admin,
            Vec::new(),
        ),
        (
            Uuid::parse_str("a3e41b62-58c9-4f0d-b7d4-0c9e6f2a81b5")?,
            "Vikram Shetty",
            "vikram.shetty@college.edu",
            Role::Faculty,
            vec!["CSE-A".to_string(), "CSE-B".to_string()],
        ),
    ];
    for (id, name, email, role, branches) in users {
        store
            .upsert_user(&User {
                id,
                email: email.to_string(),
                name: name.to_string(),
                role,
                branches,
                active: true,
                last_login: None,
                created_at: Utc::now(),
            })
            .await?;
    }

    // (branch, week, attendance, test attendance, pass, covered, total)
    let rows = [
        ("CSE-A", 1, 88.0, 92.0, 74.0, 4, 24),
        ("CSE-A", 2, 90.0, 95.0, 78.0, 8, 24),
        ("CSE-A", 3, 86.0, 90.0, 80.0, 12, 24),
        ("CSE-A", 4, 91.0, 94.0, 83.0, 15, 24),
        ("CSE-B", 1, 80.0, 85.0, 62.0, 4, 24),
        ("CSE-B", 2, 78.0, 82.0, 58.0, 7, 24),
        ("CSE-B", 3, 82.0, 88.0, 64.0, 10, 24),
        ("ECE-A", 1, 72.0, 80.0, 55.0, 3, 24),
        ("ECE-A", 2, 70.0, 76.0, 51.0, 6, 24),
        ("ECE-A", 3, 74.0, 81.0, 57.0, 8, 24),
        ("MECH", 1, 66.0, 70.0, 44.0, 2, 24),
        ("MECH", 2, 61.0, 68.0, 40.0, 4, 24),
        ("MECH", 3, 63.0, 72.0, 46.0, 5, 24),
        ("CIVIL", 1, 94.0, 96.0, 52.0, 3, 24),
        ("CIVIL", 2, 95.0, 97.0, 55.0, 5, 24),
    ];
    let actor = Actor::system();
    for (branch_code, week_no, attendance, test_attendance, pass, covered, total) in rows {
        let input = ReportInput {
            branch_code: branch_code.to_string(),
            week_no,
            sessions: 5,
            attendance_percent: attendance,
            test_attendance_percent: test_attendance,
            test_pass_percent: pass,
            syllabus_covered: covered,
            syllabus_total: total,
            status: Some(ReportStatus::Finalized),
        };
        // Re-seeding leaves already finalized weeks alone.
        match reports::save_report(store, &input, &actor).await {
            Ok(_) | Err(crate::error::Error::Forbidden(_)) => {}
            Err(err) => {
                return Err(err).with_context(|| format!("failed to seed {branch_code} week {week_no}"))
            }
        }
    }

    aggregation::refresh(store, None).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn seed_is_repeatable() {
        let store = MemoryStore::new();
        seed(&store).await.unwrap();
        seed(&store).await.unwrap();

        assert_eq!(store.list_branches().await.unwrap().len(), 5);
        assert_eq!(store.list_weeks().await.unwrap().len(), 6);
        assert_eq!(store.list_users().await.unwrap().len(), 2);
        assert_eq!(store.list_summaries().await.unwrap().len(), 5);
    }
}
