//! HTTP pipeline shared by every resource module.
//!
//! Requests are prefixed with the session base URL and carry the bearer
//! token plus the `lang` and `mode` headers. Responses are unwrapped to
//! their JSON body; failures are split into offline (no response) and
//! rejected (non-2xx status).

use nabii_primitives::common::{Language, Mode};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use url::form_urlencoded;

use crate::errors::{ErrorKind, ErrorResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestType {
    Get,
    Post,
    Patch,
    Delete,
}

/// Session state a single request is built from. Taken as a snapshot so no
/// lock is held while the request is in flight.
#[derive(Clone, Debug)]
pub(crate) struct RequestContext {
    pub base_url: String,
    pub bearer: Option<String>,
    pub language: Language,
    pub mode: Mode,
}

#[derive(Clone, Debug)]
pub(crate) struct Connection {
    client: Client,
}

impl Connection {
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Sends one request and returns the raw body of a successful response.
    pub async fn execute<Q, B>(
        &self,
        context: &RequestContext,
        req_type: RequestType,
        path: &str,
        query: Option<&Q>,
        body: Option<&B>,
    ) -> Result<String, ErrorKind>
    where
        Q: Serialize + ?Sized,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{path}", context.base_url);

        let mut builder = match req_type {
            RequestType::Get => self.client.get(&url),
            RequestType::Post => self.client.post(&url),
            RequestType::Patch => self.client.patch(&url),
            RequestType::Delete => self.client.delete(&url),
        };

        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(bearer) = &context.bearer {
            builder = builder.header(AUTHORIZATION, bearer);
        }

        builder = builder
            .header(ACCEPT, "application/json")
            .header("lang", context.language.as_str())
            .header("mode", context.mode.as_str());

        debug!(method = ?req_type, %url, "Sending request");

        let offline = |err: reqwest::Error| ErrorKind::Offline {
            path: path.to_owned(),
            reason: err.to_string(),
        };

        let response = builder.send().await.map_err(offline)?;
        let status = response.status();
        let text = response.text().await.map_err(offline)?;

        if !status.is_success() {
            debug!(method = ?req_type, %url, status = status.as_u16(), "Request rejected");
            return Err(ErrorKind::Rejected {
                path: path.to_owned(),
                response: ErrorResponse {
                    status: status.as_u16(),
                    body: text,
                },
            });
        }

        Ok(text)
    }
}

/// Parses a response body. An empty body reads as JSON `null`.
pub(crate) fn decode<O: DeserializeOwned>(path: &str, text: &str) -> Result<O, ErrorKind> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|err| ErrorKind::InvalidResponse {
        path: path.to_owned(),
        reason: err.to_string(),
    })
}

/// Percent-encodes a value used as a single path segment.
pub(crate) fn encode_segment(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn context(server: &MockServer, bearer: Option<&str>) -> RequestContext {
        RequestContext {
            base_url: server.uri(),
            bearer: bearer.map(str::to_owned),
            language: Language::En,
            mode: Mode::Test,
        }
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("a@b.com"), "a%40b.com");
        assert_eq!(encode_segment("john doe"), "john%20doe");
        assert_eq!(encode_segment("1.2.3"), "1.2.3");
    }

    #[test]
    fn test_decode_empty_body_as_null() {
        let value: Option<u32> = decode("/x", "").unwrap();
        assert_eq!(value, None);

        decode::<()>("/x", "  ").unwrap();

        let err = decode::<u32>("/x", "{").unwrap_err();
        assert!(matches!(err, ErrorKind::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn test_session_headers_are_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer token"))
            .and(header("lang", "en"))
            .and(header("mode", "test"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let connection = Connection::new(Client::new());
        let text = connection
            .execute(
                &context(&server, Some("Bearer token")),
                RequestType::Get,
                "/auth/me",
                Some(&[("page", "2")]),
                None::<&()>,
            )
            .await
            .unwrap();

        let value: Value = decode("/auth/me", &text).unwrap();
        assert_eq!(value, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn test_non_success_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
            .mount(&server)
            .await;

        let connection = Connection::new(Client::new());
        let err = connection
            .execute(
                &context(&server, None),
                RequestType::Post,
                "/auth/login",
                None::<&()>,
                Some(&json!({ "email": "a@b.com" })),
            )
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ErrorKind::Rejected {
                path: "/auth/login".to_owned(),
                response: ErrorResponse {
                    status: 403,
                    body: "Forbidden".to_owned(),
                },
            }
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let context = RequestContext {
            base_url: format!("http://{addr}"),
            bearer: None,
            language: Language::Fr,
            mode: Mode::Production,
        };

        let connection = Connection::new(Client::new());
        let err = connection
            .execute(&context, RequestType::Get, "/ping", None::<&()>, None::<&()>)
            .await
            .unwrap_err();

        assert!(matches!(err, ErrorKind::Offline { .. }));
    }
}
