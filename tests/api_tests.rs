//! End-to-end API tests. These need a live PostgreSQL reachable through
//! `DATABASE_URL` (each test creates and drops its own database), so they
//! are `#[ignore]`d by default; run with `cargo test -- --include-ignored`.

mod common;

use reqwest::StatusCode;
use serde_json::json;

use gymhub::auth::otp::hash_token;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let (body, status) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    common::cleanup(app).await;
}

// ── Registration ────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn register_member_allocates_codes_and_household() {
    let app = common::spawn_app().await;

    let body = app.register_member("ana@test.com", "ana smith").await;
    assert_eq!(body["name"], "Ana Smith");
    assert_eq!(body["barcode"].as_str().unwrap().len(), 12);
    assert_eq!(body["member_code"].as_str().unwrap().len(), 7);

    // The owning household exists and carries a 5-char account code
    let code: Option<String> = sqlx::query_scalar(
        "SELECT household_code FROM households WHERE lower(owner_email) = 'ana@test.com'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert_eq!(code.unwrap().len(), 5);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn duplicate_member_name_conflicts() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    let (body, status) = app
        .post("/member", &json!({ "email": "ana@test.com", "name": "ana smith" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn register_only_returns_existing_member() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    let (body, status) = app
        .post(
            "/member/register-only",
            &json!({ "email": "ana@test.com", "name": "Ana Smith" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_existing"], true);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn family_batch_gets_distinct_codes() {
    let app = common::spawn_app().await;

    let names: Vec<String> = (0..50).map(|i| format!("Member Number{i}")).collect();
    let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let body = app.register_family("big@test.com", &name_refs).await;

    let mut barcodes: Vec<String> = body["members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["barcode"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(barcodes.len(), 50);
    barcodes.sort();
    barcodes.dedup();
    assert_eq!(barcodes.len(), 50, "allocated barcodes must be unique");

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn family_register_conflict_lists_names() {
    let app = common::spawn_app().await;
    app.register_family("fam@test.com", &["Ana Smith"]).await;

    let (body, status) = app
        .post(
            "/family/register",
            &json!({
                "email": "fam@test.com",
                "members": [{ "name": "Ana Smith" }, { "name": "Ben Smith" }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Ana Smith"));

    common::cleanup(app).await;
}

// ── Check-in idempotency ────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn second_checkin_same_period_is_idempotent() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    let (first, status) = app.post("/checkin", &json!({ "email": "ana@test.com" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_checked_in"], false);

    let (second, status) = app.post("/checkin", &json!({ "email": "ana@test.com" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_checked_in"], true);
    assert_eq!(second["timestamp"], first["timestamp"]);

    let count: i64 = sqlx::query_scalar("SELECT count(*) FROM checkins")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn checkin_by_name_is_case_insensitive() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    let (body, status) = app
        .post("/checkin/by-name", &json!({ "name": "ana SMITH" }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["already_checked_in"], false);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn barcode_scan_checks_in_remaining_family_members() {
    let app = common::spawn_app().await;
    let family = app
        .register_family("fam@test.com", &["Ana Smith", "Ben Smith", "Cal Smith"])
        .await;
    let ana_barcode = family["members"][0]["barcode"].as_str().unwrap().to_string();

    // Two of three are already in today
    app.post("/checkin/by-name", &json!({ "name": "Ben Smith" })).await;
    app.post("/checkin/by-name", &json!({ "name": "Cal Smith" })).await;

    // Scanning one not-yet-checked-in member of a family sweeps in the rest
    let (body, status) = app
        .post("/checkin-by-barcode", &json!({ "barcode": ana_barcode }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["family_checkin"], true);
    assert_eq!(body["member_count"], 1);
    assert_eq!(body["family_size"], 3);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn barcode_scan_rejects_member_already_in_today() {
    let app = common::spawn_app().await;
    let member = app.register_member("ana@test.com", "Ana Smith").await;
    let barcode = member["barcode"].as_str().unwrap().to_string();

    let (_, status) = app
        .post("/checkin-by-barcode", &json!({ "barcode": barcode }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (body, status) = app
        .post("/checkin-by-barcode", &json!({ "barcode": barcode }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already checked in"));

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn family_explicit_checkin_allows_partial_success() {
    let app = common::spawn_app().await;
    app.register_family("fam@test.com", &["Ana Smith", "Ben Smith"]).await;

    app.post("/checkin/by-name", &json!({ "name": "Ana Smith" })).await;

    let (body, status) = app
        .post(
            "/family/checkin",
            &json!({
                "email": "fam@test.com",
                "member_names": ["Ana Smith", "Ben Smith", "Nobody Here"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let results: Vec<String> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap().to_string())
        .collect();
    assert!(results[0].contains("Already checked in"));
    assert!(results[1].contains("Check-in successful"));
    assert!(results[2].contains("Member not found"));

    common::cleanup(app).await;
}

// ── Admin check-in ──────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn admin_checkin_dedupes_within_one_minute() {
    let app = common::spawn_app().await;
    let member = app.register_member("ana@test.com", "Ana Smith").await;
    let member_id = member["id"].as_str().unwrap().to_string();

    let ts = "2025-03-01T15:30:00Z";
    let (first, status) = app
        .post(
            "/admin/checkin/member",
            &json!({ "member_id": member_id, "timestamp": ts }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_checked_in"], false);

    let (second, status) = app
        .post(
            "/admin/checkin/member",
            &json!({ "member_id": member_id, "timestamp": ts }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_checked_in"], true);

    common::cleanup(app).await;
}

// ── Daily aggregation ───────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn today_view_renders_family_entry_for_partial_checkin() {
    let app = common::spawn_app().await;
    app.register_family("fam@test.com", &["Ana Smith", "Ben Smith"]).await;

    // Only one of the two members checks in
    app.post("/checkin/by-name", &json!({ "name": "Ana Smith" })).await;

    let (body, status) = app.get("/admin/checkins/today").await;
    assert_eq!(status, StatusCode::OK);
    let entries = body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["is_family"], true);
    assert_eq!(entries[0]["name"], "Family");
    assert_eq!(entries[0]["member_count"], 1);

    common::cleanup(app).await;
}

// ── Auth & OTP ──────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn start_account_is_enumeration_safe() {
    let app = common::spawn_app().await;

    // Valid-format code that matches no household: still a 200
    let (body, status) = app
        .post("/v1/auth/start-account", &json!({ "accountNumber": "ZZZZZ" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("If an account exists"));

    // Malformed code: format error, not a lookup
    let (_, status) = app
        .post("/v1/auth/start-account", &json!({ "accountNumber": "AB" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn otp_requests_are_rate_limited_per_minute() {
    let app = common::spawn_app().await;

    let (_, status) = app
        .post("/v1/auth/start", &json!({ "email": "ana@test.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, status) = app
        .post("/v1/auth/start", &json!({ "email": "ana@test.com" }))
        .await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // A different email is a different key
    let (_, status) = app
        .post("/v1/auth/start", &json!({ "email": "ben@test.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn otp_verify_issues_session() {
    let app = common::spawn_app().await;

    let (body, status) = app
        .post("/v1/auth/start", &json!({ "email": "ana@test.com" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["to"], "a***@t***.com");
    let pending_id = body["pendingId"].as_str().unwrap().to_string();

    // Plant a known code; only the hash is stored
    sqlx::query("UPDATE households SET email_verification_token_hash = $1 WHERE id = $2::uuid")
        .bind(hash_token("123456"))
        .bind(&pending_id)
        .execute(&app.pool)
        .await
        .unwrap();

    let (_, status) = app
        .post(
            "/v1/auth/verify",
            &json!({ "pendingId": pending_id, "code": "999999" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (body, status) = app
        .post(
            "/v1/auth/verify",
            &json!({ "pendingId": pending_id, "code": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    let token = body["session_token"].as_str().unwrap().to_string();

    // Bearer fallback works for the post-verify cookie race
    let resp = app
        .client
        .get(app.url("/v1/auth/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Verification is single-use
    let (_, status) = app
        .post(
            "/v1/auth/verify",
            &json!({ "pendingId": pending_id, "code": "123456" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn account_code_login_skips_otp() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    let code: Option<String> = sqlx::query_scalar(
        "SELECT household_code FROM households WHERE lower(owner_email) = 'ana@test.com'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let (body, status) = app
        .post("/v1/auth/login-account", &json!({ "accountNumber": code.unwrap() }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["ok"], true);
    assert_eq!(body["members"].as_array().unwrap().len(), 1);

    let (_, status) = app
        .post("/v1/auth/login-account", &json!({ "accountNumber": "ZZZZZ" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn session_probe_requires_auth() {
    let app = common::spawn_app().await;

    let (_, status) = app.get("/v1/auth/session").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

// ── Member lifecycle ────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn email_update_cascades_to_family() {
    let app = common::spawn_app().await;
    let body = app
        .register_family("old@test.com", &["Ana Smith", "Ben Smith"])
        .await;
    let ana_id = body["member_ids"][0].as_str().unwrap().to_string();

    let (_, status) = app
        .put(
            &format!("/member/{ana_id}"),
            &json!({ "name": "Ana Smith", "email": "new@test.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let count: i64 =
        sqlx::query_scalar("SELECT count(*) FROM members WHERE email = 'new@test.com'")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(count, 2, "both family members must follow the email change");

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn soft_delete_and_restore_transitions() {
    let app = common::spawn_app().await;
    let member = app.register_member("ana@test.com", "Ana Smith").await;
    let id = member["id"].as_str().unwrap().to_string();

    let (_, status) = app.delete(&format!("/member/{id}/soft")).await;
    assert_eq!(status, StatusCode::OK);

    // Soft-deleting again is an illegal transition
    let (_, status) = app.delete(&format!("/member/{id}/soft")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, status) = app.post(&format!("/member/{id}/restore"), &json!({})).await;
    assert_eq!(status, StatusCode::OK);

    // Restoring an active member is an illegal transition
    let (_, status) = app.post(&format!("/member/{id}/restore"), &json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn hard_delete_cascades_checkins() {
    let app = common::spawn_app().await;
    let member = app.register_member("ana@test.com", "Ana Smith").await;
    let id = member["id"].as_str().unwrap().to_string();

    app.post("/checkin", &json!({ "email": "ana@test.com" })).await;

    let (_, status) = app.delete(&format!("/member/{id}")).await;
    assert_eq!(status, StatusCode::OK);

    let checkins: i64 = sqlx::query_scalar("SELECT count(*) FROM checkins")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(checkins, 0);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn family_delete_removes_household_and_frees_code() {
    let app = common::spawn_app().await;
    app.register_family("fam@test.com", &["Ana Smith", "Ben Smith"]).await;

    let (body, status) = app.delete("/family/fam@test.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_members"], 2);

    let households: i64 = sqlx::query_scalar("SELECT count(*) FROM households")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(households, 0);

    let (_, status) = app.get("/family/members/fam@test.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

// ── Reporting ───────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn member_stats_reports_streaks() {
    let app = common::spawn_app().await;
    let member = app.register_member("ana@test.com", "Ana Smith").await;
    let id = member["id"].as_str().unwrap().to_string();

    app.post("/checkin", &json!({ "email": "ana@test.com" })).await;

    let (body, status) = app.get(&format!("/member/{id}/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["current_streak"], 1);
    assert_eq!(body["highest_streak"], 1);
    assert!(body["monthly_check_ins"].as_i64().unwrap() >= 1);

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn range_report_rejects_bad_group_by() {
    let app = common::spawn_app().await;

    let (_, status) = app
        .get("/admin/checkins/range?start_date=2025-01-01&end_date=2025-01-31&group_by=hour")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (body, status) = app
        .get("/admin/checkins/range?start_date=2025-01-01&end_date=2025-01-31&group_by=day")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    common::cleanup(app).await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn admin_household_lookup_shows_today_status() {
    let app = common::spawn_app().await;
    app.register_family("fam@test.com", &["Ana Smith", "Ben Smith"]).await;
    app.post("/checkin/by-name", &json!({ "name": "Ana Smith" })).await;

    let code: Option<String> = sqlx::query_scalar(
        "SELECT household_code FROM households WHERE lower(owner_email) = 'fam@test.com'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();

    let (body, status) = app
        .get(&format!("/admin/household/{}", code.unwrap()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["member_count"], 2);

    let members = body["members"].as_array().unwrap();
    let ana = members.iter().find(|m| m["name"] == "Ana Smith").unwrap();
    let ben = members.iter().find(|m| m["name"] == "Ben Smith").unwrap();
    assert_eq!(ana["already_checked_in"], true);
    assert_eq!(ben["already_checked_in"], false);

    common::cleanup(app).await;
}

// ── Transport rate limits ───────────────────────────────────────

#[tokio::test]
#[ignore = "requires a PostgreSQL instance via DATABASE_URL"]
async fn checkin_endpoint_is_ip_rate_limited() {
    let app = common::spawn_app().await;
    app.register_member("ana@test.com", "Ana Smith").await;

    // The check-in class allows 5 per minute per IP
    for _ in 0..5 {
        let (_, status) = app.post("/checkin", &json!({ "email": "ana@test.com" })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, status) = app.post("/checkin", &json!({ "email": "ana@test.com" })).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    common::cleanup(app).await;
}
