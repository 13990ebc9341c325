//! Integration tests for the HTTP API, run against an in-memory store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use crt_analytics::{build_router, AppState};
use serde_json::{json, Value};
use tower::util::ServiceExt; // for `oneshot`

fn setup_app() -> Router {
    build_router(AppState::in_memory())
}

fn admin_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    request_as("admin", "u-admin", "", method, uri, body)
}

fn request_as(
    role: &str,
    user_id: &str,
    branches: &str,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-user-id", user_id)
        .header("x-user-name", format!("Test {role}"))
        .header("x-user-role", role)
        .header("x-user-branches", branches);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn report(branch_code: &str, week_no: i32, attendance: f64, pass: f64, status: &str) -> Value {
    json!({
        "branch_code": branch_code,
        "week_no": week_no,
        "sessions": 5,
        "attendance_percent": attendance,
        "test_attendance_percent": 100.0,
        "test_pass_percent": pass,
        "syllabus_covered": 10,
        "syllabus_total": 20,
        "status": status,
    })
}

// =============================================================================
// Health and identity
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_identity_required() {
    let app = setup_app();
    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "crt-analytics");
    assert_eq!(body["storage"], "memory");
}

#[tokio::test]
async fn test_api_requires_identity_headers() {
    let app = setup_app();
    let request = Request::builder()
        .uri("/api/reports")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

// =============================================================================
// Reports
// =============================================================================

#[tokio::test]
async fn test_report_create_then_duplicate_conflicts() {
    let app = setup_app();
    let body = report("CSE-A", 1, 80.0, 70.0, "draft");

    let (status, created) = send(
        &app,
        admin_request("POST", "/api/reports?create_only=true", Some(body.clone())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "draft");
    // 0.4*80 + 0.4*70 + 0.2*50 = 70
    assert_eq!(created["computed"]["overall_score"], 70.0);

    let (status, _) = send(
        &app,
        admin_request("POST", "/api/reports?create_only=true", Some(body)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_finalized_report_rejects_edits_until_reopened() {
    let app = setup_app();
    let (status, _) = send(
        &app,
        admin_request("POST", "/api/reports", Some(report("ECE-A", 2, 75.0, 60.0, "finalized"))),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        admin_request("POST", "/api/reports", Some(report("ECE-A", 2, 90.0, 60.0, "draft"))),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("finalized"));

    let faculty_reopen = request_as("faculty", "u-fac", "ECE-A", "POST", "/api/reports/ECE-A/2/reopen", None);
    let (status, _) = send(&app, faculty_reopen).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, reopened) = send(
        &app,
        admin_request("POST", "/api/reports/ECE-A/2/reopen", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reopened["status"], "draft");
    assert_eq!(reopened["locked_at"], Value::Null);

    let (status, updated) = send(
        &app,
        admin_request("POST", "/api/reports", Some(report("ECE-A", 2, 90.0, 60.0, "draft"))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["attendance_percent"], 90.0);
}

#[tokio::test]
async fn test_out_of_range_percent_is_rejected() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        admin_request("POST", "/api/reports", Some(report("CSE-A", 1, 104.0, 70.0, "draft"))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("attendance"));
}

#[tokio::test]
async fn test_bulk_upload_collects_item_errors() {
    let app = setup_app();
    let payload = json!({
        "reports": [
            report("CSE-A", 1, 80.0, 70.0, "finalized"),
            report("CSE-B", 1, -5.0, 70.0, "finalized"),
            report("MECH", 1, 60.0, 45.0, "draft"),
        ]
    });

    let (status, body) = send(&app, admin_request("POST", "/api/reports/bulk", Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(body["errors"][0]["index"], 1);
}

#[tokio::test]
async fn test_faculty_list_is_narrowed_to_assigned_branches() {
    let app = setup_app();
    for code in ["CSE-A", "MECH"] {
        send(
            &app,
            admin_request("POST", "/api/reports", Some(report(code, 1, 80.0, 70.0, "draft"))),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        request_as("faculty", "u-fac", "CSE-A", "GET", "/api/reports", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["branch_code"], "CSE-A");

    let (status, _) = send(
        &app,
        request_as("faculty", "u-fac", "CSE-A", "GET", "/api/reports?branch_code=MECH", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// =============================================================================
// Summaries, overrides and audit
// =============================================================================

#[tokio::test]
async fn test_summary_override_and_revert_flow() {
    let app = setup_app();
    send(
        &app,
        admin_request("POST", "/api/reports", Some(report("CSE-A", 1, 80.0, 60.0, "finalized"))),
    )
    .await;
    send(
        &app,
        admin_request("POST", "/api/reports", Some(report("CSE-A", 2, 90.0, 80.0, "finalized"))),
    )
    .await;

    let (status, summaries) = send(&app, admin_request("GET", "/api/summary?refresh=true", None)).await;
    assert_eq!(status, StatusCode::OK);
    let summary = &summaries[0];
    assert_eq!(summary["branch_code"], "CSE-A");
    assert_eq!(summary["avg_attendance"], 85.0);
    // 0.4*85 + 0.4*70 + 0.2*50 = 72
    assert_eq!(summary["performance_grade"], "B+");

    let (status, edited) = send(
        &app,
        admin_request(
            "POST",
            "/api/summary/update",
            Some(json!({ "branch_code": "CSE-A", "field": "avg_attendance", "value": 100.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(edited["avg_attendance"], 100.0);
    assert_eq!(edited["overrides"]["avg_attendance"], 100.0);
    assert_eq!(edited["ai_values"]["avg_attendance"], 85.0);
    // 0.4*100 + 0.4*70 + 0.2*50 = 78
    assert_eq!(edited["performance_grade"], "B+");

    // refresh keeps the override
    let (_, refreshed) = send(&app, admin_request("POST", "/api/summary/refresh", None)).await;
    assert_eq!(refreshed[0]["avg_attendance"], 100.0);

    let (status, reverted) = send(
        &app,
        admin_request(
            "POST",
            "/api/summary/revert",
            Some(json!({ "branch_code": "CSE-A", "field": "avg_attendance" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reverted["avg_attendance"], 85.0);
    assert_eq!(reverted["overrides"], json!({}));

    let (status, history) = send(&app, admin_request("GET", "/api/audit/CSE-A", None)).await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|item| item["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["REVERT_EDIT", "MANUAL_EDIT"]);
    assert_eq!(history[0]["field"], "avg_attendance");
    assert_eq!(history[0]["user"], "Test admin");
}

#[tokio::test]
async fn test_summary_update_rejects_unknown_field_and_missing_branch() {
    let app = setup_app();
    let (status, _) = send(
        &app,
        admin_request(
            "POST",
            "/api/summary/update",
            Some(json!({ "branch_code": "CSE-A", "field": "total_weeks", "value": 3.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/api/summary/update",
            Some(json!({ "branch_code": "NOPE", "field": "avg_test_pass", "value": 30.0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "branch summary not found");
}

#[tokio::test]
async fn test_malformed_bodies_and_queries_return_json_400() {
    let app = setup_app();
    let (status, body) = send(
        &app,
        admin_request(
            "POST",
            "/api/summary/update",
            Some(json!({ "branch_code": "CSE-A", "field": "avg_attendance" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("value"));

    let mut request = admin_request("POST", "/api/reports", None);
    *request.body_mut() = Body::from("{not json");
    request
        .headers_mut()
        .insert("content-type", "application/json".parse().unwrap());
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, admin_request("GET", "/api/reports?week_no=abc", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(
        &app,
        admin_request("PATCH", "/api/mitigation/not-a-uuid", Some(json!({ "status": "COMPLETED" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_viewers_cannot_refresh_through_either_route() {
    let app = setup_app();
    send(
        &app,
        admin_request("POST", "/api/reports", Some(report("CSE-A", 1, 80.0, 60.0, "finalized"))),
    )
    .await;

    let (status, _) = send(
        &app,
        request_as("viewer", "u-view", "", "POST", "/api/summary/refresh", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request_as("viewer", "u-view", "", "GET", "/api/summary?refresh=true", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());

    // nothing was refreshed
    let (status, summaries) = send(&app, admin_request("GET", "/api/summary", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summaries, json!([]));

    let (status, _) = send(
        &app,
        request_as("viewer", "u-view", "", "GET", "/api/summary", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_risk_board_uses_summary_values() {
    let app = setup_app();
    send(
        &app,
        admin_request("POST", "/api/reports", Some(report("MECH", 1, 60.0, 40.0, "finalized"))),
    )
    .await;
    send(
        &app,
        admin_request("POST", "/api/reports", Some(report("CSE-A", 1, 90.0, 85.0, "finalized"))),
    )
    .await;
    send(&app, admin_request("POST", "/api/summary/refresh", None)).await;

    let (status, board) = send(&app, admin_request("GET", "/api/risk", None)).await;
    assert_eq!(status, StatusCode::OK);
    let high_risk = board["high_risk"].as_array().unwrap();
    assert_eq!(high_risk.len(), 1);
    assert_eq!(high_risk[0]["branch_code"], "MECH");
    assert!(board["critical_syllabus"].as_array().unwrap().is_empty());
}

// =============================================================================
// Ingestion and analytics
// =============================================================================

#[tokio::test]
async fn test_ingest_csv_body_and_analytics() {
    let app = setup_app();
    let csv = "branch,week,sessions,attendance,test_attendance,test_pass,covered,total,status\n\
               CSE-A,1,5,70%,90,60,5,20,finalized\n\
               CSE-A,2,5,80%,90,70,10,20,finalized\n\
               ME,1,5,120,90,70,10,20,finalized\n";
    let request = Request::builder()
        .method("POST")
        .uri("/api/ingest?filename=week2.csv")
        .header("x-user-id", "u-admin")
        .header("x-user-role", "admin")
        .header("content-type", "text/csv")
        .body(Body::from(csv))
        .unwrap();

    let (status, log) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(log["filename"], "week2.csv");
    assert_eq!(log["status"], "PARTIAL_SUCCESS");
    assert_eq!(log["success_count"], 2);
    assert_eq!(log["anomalies"][0]["row_index"], 3);
    assert_eq!(log["anomalies"][0]["severity"], "CRITICAL");

    let (status, overview) = send(&app, admin_request("GET", "/api/analytics", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(overview["trend"].as_array().unwrap().len(), 2);
    assert_eq!(overview["insights"][0]["id"], "attendance-trend");
    assert_eq!(overview["predictions"][0]["label"], "W3 (P)");
    assert_eq!(overview["predictions"][0]["attendance"], 90.0);

    let (status, branch) = send(
        &app,
        admin_request("GET", "/api/analytics/branch/CSE-A", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(branch["series"].as_array().unwrap().len(), 2);

    let (status, _) = send(&app, admin_request("GET", "/api/analytics/branch/CIVIL", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_attendance_sheet_save_and_list() {
    let app = setup_app();
    let payload = json!({
        "week_no": 3,
        "branches": [
            { "branch_code": "CSE-A", "strength": 60, "daily": [45, 50, "No CRT", 30] }
        ]
    });

    let (status, records) = send(&app, admin_request("POST", "/api/crt/records", Some(payload))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(records[0]["percents"], json!([75, 83, "No CRT", 50]));
    assert_eq!(records[0]["weekly_average_percent"], 69);
    assert_eq!(records[0]["trend"], "Dropping");

    let over = json!({
        "week_no": 3,
        "branches": [{ "branch_code": "MECH", "strength": 40, "daily": [41] }]
    });
    let (status, _) = send(&app, admin_request("POST", "/api/crt/records", Some(over))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, listed) = send(&app, admin_request("GET", "/api/crt/records?week_no=3", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

// =============================================================================
// Directory
// =============================================================================

#[tokio::test]
async fn test_announcement_validation_and_create() {
    let app = setup_app();
    let (status, _) = send(
        &app,
        admin_request("POST", "/api/announcements", Some(json!({ "title": "Drive" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = send(
        &app,
        admin_request(
            "POST",
            "/api/announcements",
            Some(json!({ "title": "Drive", "message": "Infosys on Friday", "priority": "Urgent" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["target_audience"], json!(["All"]));

    let (_, listed) = send(
        &app,
        request_as("viewer", "u-view", "", "GET", "/api/announcements", None),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_mitigation_lifecycle_over_http() {
    let app = setup_app();
    let (status, task) = send(
        &app,
        admin_request(
            "POST",
            "/api/mitigation",
            Some(json!({
                "branch_code": "MECH",
                "type": "ACADEMIC",
                "description": "Extra aptitude sessions",
                "priority": "HIGH"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "PENDING");
    let id = task["id"].as_str().unwrap().to_string();

    let (status, done) = send(
        &app,
        admin_request(
            "PATCH",
            &format!("/api/mitigation/{id}"),
            Some(json!({ "status": "COMPLETED" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(done["completed_at"].is_string());

    let (status, _) = send(
        &app,
        admin_request(
            "PATCH",
            "/api/mitigation/00000000-0000-4000-8000-000000000000",
            Some(json!({ "status": "IN_PROGRESS" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, listed) = send(
        &app,
        admin_request("GET", "/api/mitigation?branch_code=MECH&status=COMPLETED", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_users_are_admin_only() {
    let app = setup_app();
    let (status, _) = send(
        &app,
        request_as("faculty", "u-fac", "CSE-A", "GET", "/api/users", None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = send(&app, admin_request("GET", "/api/users", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(users.as_array().unwrap().is_empty());
}
