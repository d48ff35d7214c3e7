use axum::http::StatusCode;
use axum_test::TestServer;
use bh_axum::{config::AxumConfig, router};
use rstest::*;
use serde_json::{Value, json};
use time::Duration;

mod app;
use app::{Permissions, T0, TestApp};

fn server(app: &TestApp) -> TestServer {
    TestServer::new(router(app.clone(), AxumConfig::default())).unwrap()
}

fn token(permissions: Permissions) -> String {
    permissions.to_string()
}

fn rfc3339(at: time::OffsetDateTime) -> String {
    at.format(&time::format_description::well_known::Rfc3339)
        .unwrap()
}

/// Create an auction on `project` open from T0+1h to T0+2h and activate it
async fn live_auction(server: &TestServer, project: i64) -> i64 {
    let created = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({
            "project_id": project,
            "bidding_started_at": rfc3339(T0 + Duration::hours(1)),
            "bidding_deadline": rfc3339(T0 + Duration::hours(2)),
        }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let auction_id = created.json::<Value>()["id"].as_i64().unwrap();

    server
        .put(&format!("/auctions/{auction_id}"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "status": 1 }))
        .await
        .assert_status_ok();
    auction_id
}

fn assert_error(body: &Value, status: u16, code: &str) {
    assert_eq!(body["success"], false);
    assert_eq!(body["status"], status);
    assert_eq!(body["error"], code);
    assert!(body["message"].is_string());
}

#[test_log::test(tokio::test)]
async fn test_health_and_docs() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);

    let health = server.get("/health").await;
    health.assert_status_ok();
    assert_eq!(health.json::<Value>()["status"], "ok");

    let docs = server.get("/docs/api.json").await;
    docs.assert_status_ok();
    let docs: Value = docs.json();
    assert!(docs["paths"]["/bids/dual"].is_object());
    assert!(docs["paths"]["/verification/verify"].is_object());
}

#[test_log::test(tokio::test)]
async fn test_auction_management() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let body = json!({
        "project_id": "1",
        "bidding_started_at": rfc3339(T0 + Duration::hours(1)),
        "bidding_deadline": rfc3339(T0 + Duration::hours(2)),
    });

    let forbidden = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&body)
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_error(&forbidden.json(), 403, "forbidden");

    let created = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::company()))
        .json(&body)
        .await;
    created.assert_status(StatusCode::CREATED);
    let auction: Value = created.json();
    assert_eq!(auction["status"], 0);
    assert_eq!(auction["project_id"], 1);

    let duplicate = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::company()))
        .json(&body)
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    let duplicate: Value = duplicate.json();
    assert_error(&duplicate, 409, "auction_exists");
    assert_eq!(duplicate["details"]["auction_id"], auction["id"]);

    let unknown = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({
            "project_id": 99,
            "bidding_started_at": rfc3339(T0),
            "bidding_deadline": rfc3339(T0 + Duration::hours(1)),
        }))
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);

    let backwards = server
        .post("/auctions/create")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({
            "project_id": 2,
            "bidding_started_at": rfc3339(T0 + Duration::hours(2)),
            "bidding_deadline": rfc3339(T0 + Duration::hours(1)),
        }))
        .await;
    backwards.assert_status(StatusCode::BAD_REQUEST);
    assert_error(&backwards.json(), 400, "validation_error");

    let listed = server.get("/auctions").add_query_param("status", 0).await;
    listed.assert_status_ok();
    assert_eq!(listed.json::<Value>().as_array().map(Vec::len), Some(1));

    let id = auction["id"].as_i64().unwrap();
    let skipped = server
        .put(&format!("/auctions/{id}"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "status": 2 }))
        .await;
    skipped.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_error(&skipped.json(), 422, "invalid_transition");

    let empty = server
        .put(&format!("/auctions/{id}"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({}))
        .await;
    empty.assert_status(StatusCode::BAD_REQUEST);

    server
        .delete(&format!("/auctions/{id}"))
        .authorization_bearer(token(Permissions::company()))
        .await
        .assert_status_ok();
    server
        .get(&format!("/auctions/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[rstest]
#[case::before_start(30, StatusCode::UNPROCESSABLE_ENTITY, Some("auction_not_started"))]
#[case::at_start(60, StatusCode::CREATED, None)]
#[case::inside(90, StatusCode::CREATED, None)]
#[case::at_deadline(120, StatusCode::CREATED, None)]
#[case::after_deadline(121, StatusCode::UNPROCESSABLE_ENTITY, Some("auction_ended"))]
#[test_log::test(tokio::test)]
async fn test_bidding_window(
    #[case] minutes: i64,
    #[case] status: StatusCode,
    #[case] code: Option<&str>,
) {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;

    app.set_now(T0 + Duration::minutes(minutes));
    let response = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 9, "amount": 100 }))
        .await;
    response.assert_status(status);
    if let Some(code) = code {
        assert_error(&response.json(), status.as_u16(), code);
    }
}

#[test_log::test(tokio::test)]
async fn test_second_bid_conflicts() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;
    app.set_now(T0 + Duration::minutes(90));

    // ids and amounts may arrive as strings
    let body = json!({
        "auction_id": auction_id.to_string(),
        "developer_id": "9",
        "amount": "100.00",
    });
    let first = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&body)
        .await;
    first.assert_status(StatusCode::CREATED);
    let first: Value = first.json();
    assert_eq!(first["amount"], 100.0);

    let second = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&body)
        .await;
    second.assert_status(StatusCode::CONFLICT);
    let second: Value = second.json();
    assert_error(&second, 409, "bid_exists");
    assert_eq!(second["details"]["bid_id"], first["id"]);
    assert_eq!(second["details"]["amount"], 100.0);

    let last = server.get(&format!("/bids/auction/{auction_id}/last")).await;
    last.assert_status_ok();
    assert_eq!(last.json::<Value>()["id"], first["id"]);
}

#[rstest]
#[case::negative(json!(-5))]
#[case::zero(json!(0))]
#[case::text(json!("ten"))]
#[test_log::test(tokio::test)]
async fn test_invalid_amounts(#[case] amount: Value) {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;
    app.set_now(T0 + Duration::minutes(90));

    let response = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 9, "amount": amount }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_error(&response.json(), 400, "validation_error");
}

#[test_log::test(tokio::test)]
async fn test_bid_ownership() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;
    app.set_now(T0 + Duration::minutes(90));

    server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(7)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 9, "amount": 10 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let bid = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 9, "amount": 10 }))
        .await
        .json::<Value>();
    let bid_id = bid["id"].as_i64().unwrap();

    server
        .put(&format!("/bids/update/{bid_id}"))
        .authorization_bearer(token(Permissions::developer(7)))
        .json(&json!({ "amount": 20 }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let updated = server
        .put(&format!("/bids/update/{bid_id}"))
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "amount": "20.5" }))
        .await;
    updated.assert_status_ok();
    assert_eq!(updated.json::<Value>()["amount"], 20.5);

    server
        .delete(&format!("/bids/delete/{bid_id}"))
        .authorization_bearer(token(Permissions::developer(9)))
        .await
        .assert_status_ok();
    server
        .delete(&format!("/bids/delete/{bid_id}"))
        .authorization_bearer(token(Permissions::developer(9)))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test)]
async fn test_reconciliation_endpoints() {
    let app = TestApp::new(true).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;
    app.set_now(T0 + Duration::minutes(90));

    let dual = server
        .post("/bids/dual")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 9, "amount": 100 }))
        .await;
    dual.assert_status(StatusCode::CREATED);
    let dual: Value = dual.json();
    assert_eq!(dual["postgres"]["key"], dual["firebase"]["key"]);
    assert_eq!(dual["blockchain"]["source"], "blockchain");
    let bid_id = dual["postgres"]["id"].as_i64().unwrap();

    // a relational-only bid
    server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(7)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 7, "amount": 80 }))
        .await
        .assert_status(StatusCode::CREATED);

    let compare = server.get(&format!("/bids/compare/{auction_id}")).await;
    compare.assert_status_ok();
    let compare: Value = compare.json();
    assert_eq!(compare["isConsistent"], false);
    assert_eq!(compare["summary"]["commonCount"], 1);
    assert_eq!(compare["summary"]["postgresOnlyCount"], 1);

    let firebase = server
        .get(&format!("/bids/source/{auction_id}"))
        .add_query_param("source", "firebase")
        .await;
    firebase.assert_status_ok();
    assert_eq!(firebase.json::<Value>().as_array().map(Vec::len), Some(1));

    let invalid = server
        .get(&format!("/bids/source/{auction_id}"))
        .add_query_param("source", "mongo")
        .await;
    invalid.assert_status(StatusCode::BAD_REQUEST);
    assert_error(&invalid.json(), 400, "invalid_source");

    server
        .post(&format!("/bids/sync/{auction_id}"))
        .authorization_bearer(token(Permissions::developer(9)))
        .await
        .assert_status(StatusCode::FORBIDDEN);
    let sync = server
        .post(&format!("/bids/sync/{auction_id}"))
        .authorization_bearer(token(Permissions::company()))
        .await;
    sync.assert_status_ok();
    let sync: Value = sync.json();
    assert_eq!(sync["postgresCount"], 2);
    assert_eq!(sync["firebaseInserted"], 1);
    assert_eq!(sync["blockchainInserted"], 1);

    let listing = server
        .get("/bids/dual-list")
        .add_query_param("storage", "both")
        .add_query_param("limit", 4)
        .await;
    listing.assert_status_ok();
    let listing: Value = listing.json();
    assert_eq!(listing["pagination"]["total"], 6);
    assert_eq!(listing["pagination"]["hasMore"], true);
    assert_eq!(listing["data"].as_array().map(Vec::len), Some(4));

    server
        .get("/bids/dual-list")
        .add_query_param("storage", "mongo")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let propagation = server.get(&format!("/bids/propagation/{bid_id}")).await;
    propagation.assert_status_ok();
    let records: Value = propagation.json();
    assert_eq!(records.as_array().map(Vec::len), Some(2));

    let ledger = server.get("/bids/ledger/developer/9").await;
    ledger.assert_status_ok();
    assert_eq!(ledger.json::<Value>().as_array().map(Vec::len), Some(1));

    // an update only reaches the relational store
    server
        .put(&format!("/bids/update/{bid_id}"))
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "amount": 250 }))
        .await
        .assert_status_ok();
    let drifted: Value = server.get(&format!("/bids/compare/{auction_id}")).await.json();
    assert_eq!(drifted["isConsistent"], false);
    assert_eq!(drifted["summary"]["commonCount"], 1);
    assert_eq!(drifted["summary"]["mismatchedCount"], 1);
    assert_eq!(drifted["mismatched"][0]["postgres"]["amount"], 250.0);
    assert_eq!(drifted["mismatched"][0]["firebase"]["amount"], 100.0);
}

#[test_log::test(tokio::test)]
async fn test_verification_codes() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);

    server
        .post("/verification/issue")
        .authorization_bearer(token(Permissions::developer(9)))
        .json(&json!({ "email": "dev9@example.com" }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let malformed = server
        .post("/verification/issue")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "email": "not an address" }))
        .await;
    malformed.assert_status(StatusCode::BAD_REQUEST);
    assert_error(&malformed.json(), 400, "validation_error");

    let issued = server
        .post("/verification/issue")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "email": " Dev9@Example.com " }))
        .await;
    issued.assert_status(StatusCode::CREATED);
    let issued: Value = issued.json();
    assert_eq!(issued["email"], "dev9@example.com");
    assert_eq!(issued["expires_at"], rfc3339(T0 + Duration::minutes(10)));
    let code = issued["code"].as_str().unwrap().to_owned();
    assert_eq!(code.len(), 6);

    let wrong = if code == "000000" { "111111" } else { "000000" };
    let rejected: Value = server
        .post("/verification/verify")
        .json(&json!({ "email": "dev9@example.com", "code": wrong }))
        .await
        .json();
    assert_eq!(rejected["verified"], false);

    let accepted = server
        .post("/verification/verify")
        .json(&json!({ "email": "DEV9@example.com", "code": code }))
        .await;
    accepted.assert_status_ok();
    assert_eq!(accepted.json::<Value>()["verified"], true);

    // codes are single-use
    let replayed: Value = server
        .post("/verification/verify")
        .json(&json!({ "email": "dev9@example.com", "code": code }))
        .await
        .json();
    assert_eq!(replayed["verified"], false);

    // and expire
    let issued: Value = server
        .post("/verification/issue")
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "email": "dev7@example.com" }))
        .await
        .json();
    app.set_now(T0 + Duration::minutes(11));
    let expired: Value = server
        .post("/verification/verify")
        .json(&json!({ "email": "dev7@example.com", "code": issued["code"] }))
        .await
        .json();
    assert_eq!(expired["verified"], false);
}

#[test_log::test(tokio::test)]
async fn test_winner_flow() {
    let app = TestApp::new(false).await.unwrap();
    let server = server(&app);
    let auction_id = live_auction(&server, 1).await;
    app.set_now(T0 + Duration::minutes(90));

    let bid = server
        .post("/bids/create")
        .authorization_bearer(token(Permissions::developer(4)))
        .json(&json!({ "auction_id": auction_id, "developer_id": 4, "amount": 250 }))
        .await
        .json::<Value>();

    let early = server
        .post(&format!("/auctions/{auction_id}/winner"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "bid_id": bid["id"] }))
        .await;
    early.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    assert_error(&early.json(), 422, "auction_not_completed");

    server
        .put(&format!("/auctions/{auction_id}"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "status": 2 }))
        .await
        .assert_status_ok();

    let winner = server
        .post(&format!("/auctions/{auction_id}/winner"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "bid_id": bid["id"] }))
        .await;
    winner.assert_status(StatusCode::CREATED);
    let winner: Value = winner.json();
    assert_eq!(winner["winner_id"], 4);
    assert_eq!(winner["bid_amount"], 250.0);

    server
        .post(&format!("/auctions/{auction_id}/winner"))
        .authorization_bearer(token(Permissions::company()))
        .json(&json!({ "bid_id": bid["id"] }))
        .await
        .assert_status(StatusCode::CONFLICT);

    let fetched = server.get(&format!("/auctions/{auction_id}/winner")).await;
    fetched.assert_status_ok();
    assert_eq!(fetched.json::<Value>()["id"], winner["id"]);
}
