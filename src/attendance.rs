//! Daily CRT attendance sheets: head counts per day, rolled up per week.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{self, AuditEvent, ATTENDANCE_ENTITY};
use crate::db::Store;
use crate::error::{Error, Result};
use crate::metrics::percent_of;
use crate::models::{
    Actor, AttendanceRecord, AuditAction, DayEntry, PerformanceLevel, RiskFlag, Trend,
};
use crate::reports::ensure_can_edit;

pub const MAX_DAYS: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchSheet {
    pub branch_code: String,
    pub strength: i32,
    pub daily: Vec<DayEntry>,
}

fn check_sheet(sheet: &BranchSheet) -> Result<()> {
    if sheet.daily.len() > MAX_DAYS {
        return Err(Error::Validation(format!(
            "{}: at most {MAX_DAYS} days per week, got {}",
            sheet.branch_code,
            sheet.daily.len()
        )));
    }
    if sheet.strength < 0 {
        return Err(Error::Validation(format!(
            "{}: strength cannot be negative",
            sheet.branch_code
        )));
    }
    for (day, entry) in sheet.daily.iter().enumerate() {
        if let Some(attended) = entry.count() {
            if attended < 0 || attended > sheet.strength {
                return Err(Error::Validation(format!(
                    "{} day {}: attended {} is outside strength {}",
                    sheet.branch_code,
                    day + 1,
                    attended,
                    sheet.strength
                )));
            }
        }
    }
    Ok(())
}

pub fn trend(active_percents: &[i32]) -> Option<Trend> {
    match active_percents {
        [.., prev, last] if last > prev => Some(Trend::Improving),
        [.., prev, last] if last < prev => Some(Trend::Dropping),
        [.., _, _] => Some(Trend::Stable),
        _ => None,
    }
}

pub fn performance_level(weekly_average_percent: i32) -> PerformanceLevel {
    match weekly_average_percent {
        75.. => PerformanceLevel::High,
        50..=74 => PerformanceLevel::Medium,
        _ => PerformanceLevel::Low,
    }
}

/// Computes day percentages and weekly indicators for one branch sheet.
pub fn process_sheet(sheet: &BranchSheet, week_no: i32) -> Result<AttendanceRecord> {
    check_sheet(sheet)?;

    let strength = f64::from(sheet.strength.max(1));
    let percents: Vec<DayEntry> = sheet
        .daily
        .iter()
        .map(|entry| match entry.count() {
            Some(attended) => DayEntry::Count(percent_of(f64::from(attended), strength).round() as i32),
            None => DayEntry::NO_CRT,
        })
        .collect();

    let active: Vec<i32> = percents.iter().filter_map(DayEntry::count).collect();
    let weekly_average_percent = if active.is_empty() {
        0
    } else {
        (f64::from(active.iter().sum::<i32>()) / active.len() as f64).round() as i32
    };
    let no_crt_days = sheet.daily.iter().filter(|entry| entry.count().is_none()).count() as i32;

    let risk_flag = if weekly_average_percent < 50 {
        RiskFlag::Critical
    } else {
        RiskFlag::Ok
    };
    let remarks = match risk_flag {
        RiskFlag::Critical => "Immediate intervention required",
        RiskFlag::Ok => "Stable",
    };

    Ok(AttendanceRecord {
        branch_code: sheet.branch_code.clone(),
        week_no,
        total_strength: sheet.strength,
        attended: sheet.daily.clone(),
        percents,
        weekly_average_percent,
        no_crt_days,
        trend: trend(&active),
        performance_level: performance_level(weekly_average_percent),
        risk_flag,
        remarks: remarks.to_string(),
        updated_at: Utc::now(),
    })
}

/// Validates every sheet first, then stores them all.
pub async fn save_sheets(
    store: &dyn Store,
    week_no: i32,
    sheets: &[BranchSheet],
    actor: &Actor,
) -> Result<Vec<AttendanceRecord>> {
    if week_no <= 0 {
        return Err(Error::Validation(format!("invalid week number: {week_no}")));
    }
    for sheet in sheets {
        ensure_can_edit(actor, &sheet.branch_code)?;
    }
    let records = sheets
        .iter()
        .map(|sheet| process_sheet(sheet, week_no))
        .collect::<Result<Vec<_>>>()?;

    for record in &records {
        store.upsert_attendance_record(record).await?;
    }

    audit::record(
        store,
        actor,
        AuditEvent::new(AuditAction::SaveAttendance, ATTENDANCE_ENTITY, format!("week-{week_no}"))
            .details(json!({ "week": week_no, "branches": records.len() })),
    )
    .await;

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn sheet(strength: i32, daily: Vec<DayEntry>) -> BranchSheet {
        BranchSheet {
            branch_code: "CSE-A".to_string(),
            strength,
            daily,
        }
    }

    #[test]
    fn computes_percents_and_weekly_average() {
        let record = process_sheet(
            &sheet(
                60,
                vec![
                    DayEntry::Count(45),
                    DayEntry::Count(50),
                    DayEntry::NO_CRT,
                    DayEntry::Count(30),
                ],
            ),
            2,
        )
        .unwrap();

        assert_eq!(
            record.percents,
            vec![
                DayEntry::Count(75),
                DayEntry::Count(83),
                DayEntry::NO_CRT,
                DayEntry::Count(50),
            ]
        );
        assert_eq!(record.weekly_average_percent, 69);
        assert_eq!(record.no_crt_days, 1);
        assert_eq!(record.trend, Some(Trend::Dropping));
        assert_eq!(record.performance_level, PerformanceLevel::Medium);
        assert_eq!(record.risk_flag, RiskFlag::Ok);
        assert_eq!(record.remarks, "Stable");
    }

    #[test]
    fn low_attendance_is_flagged_critical() {
        let record = process_sheet(&sheet(100, vec![DayEntry::Count(40), DayEntry::Count(45)]), 1).unwrap();
        assert_eq!(record.weekly_average_percent, 43);
        assert_eq!(record.trend, Some(Trend::Improving));
        assert_eq!(record.performance_level, PerformanceLevel::Low);
        assert_eq!(record.risk_flag, RiskFlag::Critical);
        assert_eq!(record.remarks, "Immediate intervention required");
    }

    #[test]
    fn attended_above_strength_is_rejected() {
        let err = process_sheet(&sheet(50, vec![DayEntry::Count(55)]), 1).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("day 1"));
    }

    #[test]
    fn week_without_sessions_has_no_trend() {
        let record = process_sheet(&sheet(40, vec![DayEntry::NO_CRT; 6]), 1).unwrap();
        assert_eq!(record.weekly_average_percent, 0);
        assert_eq!(record.no_crt_days, 6);
        assert_eq!(record.trend, None);
        assert_eq!(trend(&[80]), None);
        assert_eq!(trend(&[80, 80]), Some(Trend::Stable));
    }

    #[tokio::test]
    async fn bad_sheet_blocks_the_whole_batch() {
        let store = MemoryStore::new();
        let good = sheet(60, vec![DayEntry::Count(50)]);
        let mut bad = sheet(60, vec![DayEntry::Count(61)]);
        bad.branch_code = "ECE-A".to_string();

        assert!(save_sheets(&store, 1, &[good.clone(), bad], &Actor::system())
            .await
            .is_err());
        assert!(store.list_attendance_records(None).await.unwrap().is_empty());

        let saved = save_sheets(&store, 1, &[good], &Actor::system()).await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(store.list_attendance_records(Some(1)).await.unwrap().len(), 1);
    }
}
