use crate::domain::ports::{CallbackClient, HttpMethod, OutboundRequest, OutboundResponse};
use crate::error::{QuotingError, Result};
use async_trait::async_trait;
use reqwest::Method;
use std::time::Duration;
use tracing::debug;

/// [`CallbackClient`] over a shared `reqwest` connection pool.
#[derive(Clone)]
pub struct ReqwestCallbackClient {
    http: reqwest::Client,
}

impl ReqwestCallbackClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuotingError::Transport(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }
}

fn method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
    }
}

#[async_trait]
impl CallbackClient for ReqwestCallbackClient {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse> {
        let mut builder = self.http.request(method(request.method), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| QuotingError::Transport(format!("{} {}: {e}", request.method, request.url)))?;

        let status = response.status();
        debug!(method = %request.method, url = %request.url, status = status.as_u16(), "callback delivered");
        Ok(OutboundResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method as http_method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ReqwestCallbackClient {
        ReqwestCallbackClient::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(http_method("PUT"))
            .and(path("/quotes/Q1"))
            .and(header("fspiop-source", "payeefsp"))
            .and(body_string(r#"{"ok":true}"#))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let response = client()
            .send(OutboundRequest {
                method: HttpMethod::Put,
                url: format!("{}/quotes/Q1", server.uri()),
                headers: vec![("FSPIOP-Source".to_string(), "payeefsp".to_string())],
                body: Some(r#"{"ok":true}"#.to_string()),
            })
            .await
            .unwrap();

        assert!(response.is_success());
        assert_eq!(response.reason, "OK");
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(http_method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let response = client()
            .send(OutboundRequest {
                method: HttpMethod::Get,
                url: format!("{}/quotes/Q1", server.uri()),
                headers: Vec::new(),
                body: None,
            })
            .await
            .unwrap();

        assert_eq!(response.status, 503);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let result = client()
            .send(OutboundRequest {
                method: HttpMethod::Post,
                url: "http://127.0.0.1:1/quotes".to_string(),
                headers: Vec::new(),
                body: Some("{}".to_string()),
            })
            .await;

        assert!(matches!(result, Err(QuotingError::Transport(_))));
    }
}
