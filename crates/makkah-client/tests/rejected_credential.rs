use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use makkah_api_models::{Blog, Package};
use makkah_client::{AdminBoard, ApiClient, ApiError};
use makkah_events::{Event, EventBus};
use makkah_session::{
    CREDENTIAL_SLOT, IdentityProvider, KeyValueStore, MemoryStore, Role, Route, SessionHandle,
    SessionHolder,
};
use makkah_test_support::fixtures::identity;
use makkah_test_support::mocks::{FakeIdentityProvider, StaticRoleResolver};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Harness {
    provider: Arc<FakeIdentityProvider>,
    store: Arc<MemoryStore>,
    events: EventBus,
    session: SessionHandle,
}

async fn signed_in_admin() -> Harness {
    let provider = Arc::new(FakeIdentityProvider::signed_in(identity(
        "uid-admin",
        "admin@example.com",
    )));
    let store = Arc::new(MemoryStore::new());
    let events = EventBus::new();
    let session = SessionHolder::spawn(
        Arc::clone(&provider) as Arc<dyn IdentityProvider>,
        Arc::new(StaticRoleResolver::new(Role::Admin)),
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
        events.clone(),
    );
    let settled = timeout(WAIT, session.settled())
        .await
        .expect("session never settled");
    assert!(settled.is_admin());
    Harness {
        provider,
        store,
        events,
        session,
    }
}

#[tokio::test]
async fn rejected_credential_signs_out_and_redirects() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/blogs")
            .header("authorization", "Bearer token-uid-admin");
        then.status(401).json_body(serde_json::json!({"error": "Invalid token"}));
    });

    let harness = signed_in_admin().await;
    assert!(harness.store.get(CREDENTIAL_SLOT).is_some());
    let client = ApiClient::new(
        reqwest::Client::new(),
        server.url("/api"),
        harness.session.clone(),
    )
    .for_view(&Route::AdminBlogs);

    let err = timeout(WAIT, client.list::<Blog>())
        .await
        .expect("request timed out")
        .expect_err("rejected");
    assert!(matches!(err, ApiError::Unauthorized { ref path } if path == "/blogs"));

    let session = harness.session.snapshot();
    assert!(session.identity.is_none());
    assert!(session.role.is_none());
    assert!(!session.resolving);
    assert!(harness.store.get(CREDENTIAL_SLOT).is_none());
    assert!(harness.provider.calls().contains(&"sign_out".to_string()));

    let events: Vec<Event> = harness
        .events
        .recent()
        .into_iter()
        .map(|envelope| envelope.event)
        .collect();
    assert!(events.contains(&Event::CredentialRejected {
        path: "/blogs".into()
    }));
    assert!(events.contains(&Event::Redirected {
        to: "/login?redirect=%2Fadmin%2FadminBlog".into()
    }));
}

#[tokio::test]
async fn requests_after_sign_out_carry_no_bearer() {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/packages")
            .header("authorization", "Bearer token-uid-admin");
        then.status(401);
    });
    let anonymous = server.mock(|when, then| {
        when.method(GET).path("/packages");
        then.status(200).json_body(serde_json::json!([]));
    });

    let harness = signed_in_admin().await;
    let mut board = AdminBoard::<Package>::new(ApiClient::new(
        reqwest::Client::new(),
        server.base_url(),
        harness.session.clone(),
    ));

    let err = board.load().await.expect_err("rejected");
    assert!(err.is_unauthorized());
    assert!(board.error().is_none());

    board.load().await.expect("anonymous listing");
    anonymous.assert();
    assert!(board.items().is_empty());
}
