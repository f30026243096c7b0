//! Common test utilities for session testing
//!
//! Fixtures for the service payloads plus helpers building a client against
//! a `wiremock` server with an in-memory realtime transport.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

pub mod mocks;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nabii_client::{ClientOptions, EventKind, Listener, NabiiV1};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use self::mocks::{FakeConnector, FakePush};

pub const EMAIL: &str = "a@b.com";
pub const PASSWORD: &str = "pw";

pub fn user_json(email: &str) -> Value {
    json!({
        "id": 1,
        "firstName": "John",
        "lastName": "Doe",
        "avatar": "https://cdn.nabii.com/avatar.png",
        "email": email,
        "role": 100,
        "firebaseToken": null,
        "lastConnection": "2024-01-01T00:00:00Z",
        "isActivated": true
    })
}

pub fn credentials_json(access_token: &str, refresh_token: &str) -> Value {
    json!({
        "accessToken": access_token,
        "refreshToken": refresh_token,
        "user": user_json(EMAIL)
    })
}

pub fn options(server: &MockServer) -> ClientOptions {
    ClientOptions {
        url: server.uri(),
        ..ClientOptions::default()
    }
}

pub fn client(server: &MockServer) -> (NabiiV1, FakeConnector) {
    client_with(options(server), None)
}

pub fn client_with(options: ClientOptions, push: Option<FakePush>) -> (NabiiV1, FakeConnector) {
    let connector = FakeConnector::default();
    let mut builder = NabiiV1::builder()
        .options(options)
        .connector(connector.clone());
    if let Some(push) = push {
        builder = builder.push_provider(push);
    }
    (builder.build().unwrap(), connector)
}

pub async fn mount_login(server: &MockServer, access_token: &str, refresh_token: &str) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(credentials_json(access_token, refresh_token)),
        )
        .mount(server)
        .await;
}

/// Mounts `GET /auth/me` answering `status` for requests carrying `token`.
pub async fn mount_me(server: &MockServer, token: &str, status: u16) {
    let response = if status == 200 {
        ResponseTemplate::new(200).set_body_json(user_json(EMAIL))
    } else {
        ResponseTemplate::new(status).set_body_string("Unauthorized")
    };

    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(response)
        .mount(server)
        .await;
}

pub async fn logged_in(server: &MockServer) -> (NabiiV1, FakeConnector) {
    mount_login(server, "access-1", "refresh-1").await;
    let (nabii, connector) = client(server);
    let _credentials = nabii.auth.login(EMAIL, PASSWORD).await.unwrap();
    (nabii, connector)
}

/// Registers a listener counting its invocations.
pub fn counting_listener(nabii: &NabiiV1, kind: EventKind) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    nabii.add_event_listener(
        kind,
        Listener::new(move |_| {
            let counter = Arc::clone(&counter);
            async move {
                let _previous = counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }),
    );
    count
}

pub fn count(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
