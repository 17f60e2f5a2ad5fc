//! End-to-end tests for the change read endpoints.
//!
//! Tests use `tower::ServiceExt::oneshot` to send requests directly to the
//! router without starting a network server. Each test seeds a fresh
//! in-memory `AppState` through its store handles.

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use critic_core::{
    AccountId, Approval, ChangeId, ChangeState, ChangeStatus, FileStat, ListChangesOption,
    ObjectId, OptionSet, PatchSet,
};
use critic_server::config::ServerConfig;
use critic_server::router::build_router;
use critic_server::state::AppState;
use critic_storage::NewAccount;

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

const KEY: &str = "I7777777777777777777777777777777777777777";

struct TestApp {
    router: Router,
    owner: AccountId,
    first_meta: ObjectId,
    current_meta: ObjectId,
}

fn patch_set(number: u32, fill: u8, owner: AccountId, insertions: u32) -> PatchSet {
    PatchSet {
        number,
        revision: ObjectId::from_bytes([fill; 20]),
        uploader: owner,
        created: 1_700_000_000 + number as i64,
        commit_message: format!("Teach the lexer about raw strings\n\nPatch set {number}."),
        files: vec![FileStat {
            path: "src/lexer.rs".into(),
            insertions,
            deletions: 2,
        }],
    }
}

/// Seeds change 7 with two snapshots: patch set 1 alone, then patch set 2
/// with a Code-Review +2 and a Verified +1.
fn test_app_with(state: AppState) -> TestApp {
    let owner = state
        .accounts
        .create_account(&NewAccount {
            username: Some("jdoe".into()),
            full_name: Some("Jane Doe".into()),
            preferred_email: Some("jdoe@example.com".into()),
            active: true,
            registered_on: 0,
        })
        .unwrap()
        .id;

    let mut change = ChangeState {
        id: ChangeId(7),
        project: "compiler".into(),
        branch: "main".into(),
        change_key: KEY.into(),
        subject: "Teach the lexer about raw strings".into(),
        status: ChangeStatus::New,
        owner,
        topic: None,
        hashtags: vec![],
        created: 1_700_000_000,
        updated: 1_700_000_000,
        patch_sets: vec![patch_set(1, 0x11, owner, 10)],
        approvals: vec![],
        messages: vec![],
    };
    let first_meta = state.changes.insert_change(&change).unwrap();

    change.patch_sets.push(patch_set(2, 0x22, owner, 300));
    change.updated = 1_700_000_500;
    change.approvals = vec![
        Approval {
            label: "Code-Review".into(),
            account: owner,
            value: 2,
            patch_set: 2,
            granted: 1_700_000_400,
        },
        Approval {
            label: "Verified".into(),
            account: owner,
            value: 1,
            patch_set: 2,
            granted: 1_700_000_450,
        },
    ];
    let current_meta = state.changes.update_change(&change).unwrap();

    TestApp {
        router: build_router(state),
        owner,
        first_meta,
        current_meta,
    }
}

fn test_app() -> TestApp {
    test_app_with(AppState::in_memory())
}

/// Sends a GET request and returns (status, headers, json).
async fn get_with(
    app: &Router,
    path: &str,
    if_none_match: Option<&str>,
) -> (StatusCode, HeaderMap, serde_json::Value) {
    let mut request = Request::builder().uri(path);
    if let Some(tag) = if_none_match {
        request = request.header(IF_NONE_MATCH, tag);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(json!(null));
    (status, headers, json)
}

async fn get_json(app: &Router, path: &str) -> (StatusCode, serde_json::Value) {
    let (status, _, json) = get_with(app, path, None).await;
    (status, json)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn default_view_is_minimal() {
    let app = test_app();
    let (status, headers, body) = get_with(&app.router, "/changes/7", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        headers[CACHE_CONTROL].to_str().unwrap(),
        "private, max-age=0, must-revalidate"
    );
    assert_eq!(body["id"], format!("compiler~main~{KEY}"));
    assert_eq!(body["_number"], 7);
    assert_eq!(body["status"], "NEW");
    assert_eq!(body["owner"], json!({"_account_id": app.owner.0}));
    assert_eq!(body["insertions"], 300);
    assert_eq!(body["deletions"], 2);
    assert_eq!(body["meta_rev_id"], app.current_meta.to_hex());
    for absent in ["labels", "messages", "revisions", "current_revision", "submittable"] {
        assert!(body.get(absent).is_none(), "{absent} should be omitted");
    }
}

#[tokio::test]
async fn every_id_form_resolves() {
    let app = test_app();
    for path in [
        "/changes/7".to_string(),
        "/changes/compiler~7".to_string(),
        format!("/changes/{KEY}"),
        format!("/changes/compiler~main~{KEY}"),
    ] {
        let (status, body) = get_json(&app.router, &path).await;
        assert_eq!(status, StatusCode::OK, "{path}");
        assert_eq!(body["_number"], 7);
    }

    let (status, body) = get_json(&app.router, "/changes/8").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(body["error"]["message"], "Not found: 8");
}

#[tokio::test]
async fn flags_and_hex_options_combine() {
    let app = test_app();
    let hex = format!(
        "{:x}",
        OptionSet::of(&[ListChangesOption::CurrentCommit]).to_bits()
    );
    let path = format!("/changes/7?o=CURRENT_REVISION&o=SKIP_DIFFSTAT&O={hex}");
    let (status, body) = get_json(&app.router, &path).await;

    assert_eq!(status, StatusCode::OK);
    let current = ObjectId::from_bytes([0x22; 20]).to_hex();
    assert_eq!(body["current_revision"], current);
    assert_eq!(body["revisions"].as_object().unwrap().len(), 1);
    assert_eq!(
        body["revisions"][&current]["commit"]["subject"],
        "Teach the lexer about raw strings"
    );
    assert!(body.get("insertions").is_none());
}

#[tokio::test]
async fn invalid_options_are_bad_requests() {
    let app = test_app();
    for path in [
        "/changes/7?o=NOT_AN_OPTION",
        "/changes/7?O=xyz",
        "/changes/7?O=80000000",
        "/changes/7?meta=1234",
    ] {
        let (status, body) = get_json(&app.router, path).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    let (_, body) = get_json(&app.router, "/changes/7?meta=1234").await;
    assert_eq!(body["error"]["message"], "invalid meta SHA1: 1234");
}

#[tokio::test]
async fn meta_pins_an_older_snapshot() {
    let app = test_app();
    let path = format!(
        "/changes/7?meta={}&o=ALL_REVISIONS&o=LABELS",
        app.first_meta.to_hex()
    );
    let (status, body) = get_json(&app.router, &path).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta_rev_id"], app.first_meta.to_hex());
    assert_eq!(body["revisions"].as_object().unwrap().len(), 1);
    assert_eq!(body["insertions"], 10);
    assert!(body["labels"]["Code-Review"].get("approved").is_none());
}

#[tokio::test]
async fn empty_meta_renders_the_current_snapshot() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/changes/7?meta=").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta_rev_id"], app.current_meta.to_hex());
}

#[tokio::test]
async fn unknown_meta_is_precondition_failed() {
    let app = test_app();
    let unknown = "f".repeat(40);
    let (status, body) = get_json(&app.router, &format!("/changes/7?meta={unknown}")).await;

    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(body["error"]["code"], "PRECONDITION_FAILED");
}

#[tokio::test]
async fn detail_view_adds_labels_accounts_and_messages() {
    let app = test_app();
    let (status, body) = get_json(&app.router, "/changes/7/detail").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner"]["name"], "Jane Doe");
    assert_eq!(body["owner"]["email"], "jdoe@example.com");
    assert_eq!(body["labels"]["Code-Review"]["approved"]["username"], "jdoe");
    assert_eq!(body["labels"]["Code-Review"]["all"][0]["value"], 2);
    assert_eq!(body["messages"], json!([]));
}

#[tokio::test]
async fn change_size_plugin_contributes() {
    let app = test_app();
    let (_, body) = get_json(&app.router, "/changes/7").await;
    assert_eq!(
        body["plugins"],
        json!([{"name": "change-size", "size": "L", "lines": 302}])
    );

    let config = ServerConfig {
        plugin_change_size: false,
        ..ServerConfig::default()
    };
    let state = AppState::in_memory_with(
        config,
        std::sync::Arc::new(critic_server::accounts::directory::StaticDirectory::new()),
    );
    let app = test_app_with(state);
    let (_, body) = get_json(&app.router, "/changes/7").await;
    assert!(body.get("plugins").is_none());
}

#[tokio::test]
async fn matching_etag_is_not_modified() {
    let app = test_app();
    let (status, headers, _) = get_with(&app.router, "/changes/7", None).await;
    assert_eq!(status, StatusCode::OK);
    let etag = headers[ETAG].to_str().unwrap().to_string();

    let (status, headers, _) = get_with(&app.router, "/changes/7", Some(&etag)).await;
    assert_eq!(status, StatusCode::NOT_MODIFIED);
    assert_eq!(headers[ETAG].to_str().unwrap(), etag);

    // Different options render a different body.
    let (status, headers, _) =
        get_with(&app.router, "/changes/7?o=MESSAGES", Some(&etag)).await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(headers[ETAG].to_str().unwrap(), etag);
}
