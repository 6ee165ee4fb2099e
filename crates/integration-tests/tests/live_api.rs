//! Live API tests. Require a running server and database.

#![allow(clippy::unwrap_used)]

use autolead_integration_tests::{TestContext, unique_user};
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_health() {
    let ctx = TestContext::from_env();
    let resp = ctx.get("/health").send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_tracking_pixel_is_public_and_uncached() {
    let ctx = TestContext::from_env();

    // Unknown and malformed ids still get the image
    for query in ["", "?leadId=not-a-number", "?leadId=1c9a3e5e-8d2b-4f59-9a65-2b7f6c1d0e4a"] {
        let resp = ctx
            .get(&format!("/api/track-email{query}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "image/gif");
        assert!(
            resp.headers()["cache-control"]
                .to_str()
                .unwrap()
                .contains("no-store")
        );
        let body = resp.bytes().await.unwrap();
        assert!(body.starts_with(b"GIF89a"));
    }
}

#[tokio::test]
#[ignore = "requires a running server"]
async fn test_unsigned_requests_are_rejected() {
    let ctx = TestContext::from_env();
    let resp = ctx.get("/api/leads").send().await.unwrap();
    assert_eq!(resp.status(), 401);

    let resp = ctx
        .post("/api/generate-email")
        .json(&json!({ "businessName": "Acme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_new_user_gets_profile_with_credits() {
    let ctx = TestContext::from_env();
    let user = unique_user("credits");

    let resp = ctx
        .signed(ctx.get("/api/user-credits"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let profile: Value = resp.json().await.unwrap();
    assert_eq!(profile["id"], user.as_str());
    assert!(profile["credits"].as_i64().unwrap() >= 0);
    assert_eq!(profile["is_admin"], false);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_saved_leads_are_scoped_to_owner() {
    let ctx = TestContext::from_env();
    let owner = unique_user("owner");
    let other = unique_user("other");

    let resp = ctx
        .signed(ctx.post("/api/leads"), &owner)
        .json(&json!({
            "leads": [{
                "name": "Green Leaf Cafe",
                "address": "12 Elm St",
                "phone": "No Phone",
                "website": "",
                "category": "cafe",
                "email": "N/A",
                "rating": 4.5,
                "review_count": 10,
                "status": "Opened"
            }]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let saved: Value = resp.json().await.unwrap();
    assert_eq!(saved["leads"][0]["status"], "New");
    let id = saved["leads"][0]["id"].as_str().unwrap().to_string();

    let resp = ctx
        .signed(ctx.get(&format!("/api/leads/{id}")), &owner)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = ctx
        .signed(ctx.get(&format!("/api/leads/{id}")), &other)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_non_admin_cannot_list_profiles() {
    let ctx = TestContext::from_env();
    let user = unique_user("plain");

    let resp = ctx
        .signed(ctx.get("/api/admin/profiles"), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_enrich_without_website_is_rejected() {
    let ctx = TestContext::from_env();
    let user = unique_user("enrich");

    let resp = ctx
        .signed(ctx.post("/api/enrich-lead"), &user)
        .json(&json!({ "website": "", "businessName": "Acme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_outreach_run_with_unknown_leads_is_rejected() {
    let ctx = TestContext::from_env();
    let user = unique_user("runs");

    let resp = ctx
        .signed(ctx.post("/api/outreach/runs"), &user)
        .json(&json!({ "leadIds": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = ctx
        .signed(ctx.post("/api/outreach/runs"), &user)
        .json(&json!({ "leadIds": ["1c9a3e5e-8d2b-4f59-9a65-2b7f6c1d0e4a"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
#[ignore = "requires a running server and AUTH_SIGNING_SECRET"]
async fn test_account_of_stopped_run_cannot_be_deleted() {
    let ctx = TestContext::from_env();
    let user = unique_user("sender");

    let resp = ctx
        .signed(ctx.post("/api/email-accounts"), &user)
        .json(&json!({
            "email_address": "owner@greenleaf.example",
            "smtp_host": "smtp.greenleaf.example",
            "smtp_port": 587,
            "smtp_user": "owner@greenleaf.example",
            "smtp_pass": "app-password-9x"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let account: Value = resp.json().await.unwrap();
    let account_id = account["id"].as_i64().unwrap();

    // No usable emails, so nothing reaches SMTP
    let lead = |name: &str| {
        json!({
            "name": name,
            "address": "12 Elm St",
            "phone": "No Phone",
            "category": "cafe",
            "email": "N/A"
        })
    };
    let resp = ctx
        .signed(ctx.post("/api/leads"), &user)
        .json(&json!({ "leads": [lead("Green Leaf Cafe"), lead("Blue Door Diner")] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let saved: Value = resp.json().await.unwrap();
    let lead_ids: Vec<Value> = saved["leads"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["id"].clone())
        .collect();

    let resp = ctx
        .signed(ctx.post("/api/outreach/runs"), &user)
        .json(&json!({ "leadIds": lead_ids, "accountId": account_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);
    let started: Value = resp.json().await.unwrap();
    let run_id = started["runId"].as_str().unwrap().to_string();

    let resp = ctx
        .signed(ctx.post(&format!("/api/outreach/runs/{run_id}/cancel")), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 202);

    let resp = ctx
        .signed(ctx.delete(&format!("/api/email-accounts/{account_id}")), &user)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}
