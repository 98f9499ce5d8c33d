use std::env;
use std::time::Duration;

use futures::StreamExt;
use reqwest::{Client as ReqwestClient, Response};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{Error, Result};
use crate::ndjson::process_ndjson;
use crate::observability::{
    CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS, STREAM_DURATION, STREAM_ERRORS, STREAM_EVENTS,
    STREAM_TTFB,
};
use crate::types::{ChatRequest, ChatResponse, ListResponse, ShowRequest, ShowResponse};

const DEFAULT_HOST: &str = "http://127.0.0.1:11434/";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a model server speaking the NDJSON chat protocol.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    client: ReqwestClient,
}

impl Client {
    /// Create a new client against the default host.
    ///
    /// The host can be overridden with the QUILL_HOST environment variable.
    pub fn new() -> Result<Self> {
        Self::with_host(None)
    }

    /// Create a new client against the given host.
    ///
    /// When `host` is None, QUILL_HOST is consulted before falling back to
    /// the default. A host without a scheme is assumed to be http.
    pub fn with_host(host: Option<String>) -> Result<Self> {
        let host = match host {
            Some(host) => host,
            None => env::var("QUILL_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string()),
        };
        let host = if host.contains("://") {
            host
        } else {
            format!("http://{host}")
        };
        // Url::join treats a path without a trailing slash as a file
        let host = if host.ends_with('/') {
            host
        } else {
            format!("{host}/")
        };
        let base_url = Url::parse(&host)
            .map_err(|e| Error::url(format!("invalid host '{host}': {e}"), Some(e)))?;

        let client = ReqwestClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self { base_url, client })
    }

    /// The base URL this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::url(format!("invalid endpoint '{path}': {e}"), Some(e)))
    }

    /// Map a reqwest transport error to our error type.
    fn request_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Error::connection(format!("connection error: {e}"), Some(Box::new(e)))
        } else {
            Error::http_client(format!("request failed: {e}"), Some(Box::new(e)))
        }
    }

    /// Process an unsuccessful response into our error type.
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let message = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error)
            .unwrap_or_else(|| error_body.clone());

        match status_code {
            400 => Error::bad_request(message, None),
            404 => Error::not_found(message),
            408 => Error::timeout(message),
            _ => Error::api(status_code, message),
        }
    }

    /// Check that the server is reachable.
    pub async fn heartbeat(&self) -> Result<()> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("")?;
        let response = self.client.get(url).send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            Self::request_error(e)
        })?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(())
    }

    /// List the models the server has available.
    pub async fn list(&self) -> Result<ListResponse> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/tags")?;
        let response = self.client.get(url).send().await.map_err(|e| {
            CLIENT_REQUEST_ERRORS.click();
            Self::request_error(e)
        })?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        response.json::<ListResponse>().await.map_err(|e| {
            Error::serialization(
                format!("failed to parse model list: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Fetch the details of a single model.
    pub async fn show(&self, name: &str) -> Result<ShowResponse> {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/show")?;
        let request = ShowRequest {
            name: name.to_string(),
        };
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Self::request_error(e)
            })?;
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        response.json::<ShowResponse>().await.map_err(|e| {
            Error::serialization(
                format!("failed to parse model details: {e}"),
                Some(Box::new(e)),
            )
        })
    }

    /// Send a chat request and stream the response events through a callback.
    ///
    /// The callback is invoked once per NDJSON event as it arrives. The call
    /// resolves once the server signals completion, the callback returns an
    /// error, or `cancel` fires. Cancellation is observed both while waiting
    /// for the response headers and between streamed events, and surfaces as
    /// an error for which [`Error::is_cancelled`] returns true.
    pub async fn chat<F>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        mut on_event: F,
    ) -> Result<()>
    where
        F: FnMut(ChatResponse) -> Result<()>,
    {
        CLIENT_REQUESTS.click();
        let url = self.endpoint("api/chat")?;
        let start = std::time::Instant::now();

        let send = self.client.post(url).json(request).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::cancelled("chat request cancelled"));
            }
            response = send => response.map_err(|e| {
                CLIENT_REQUEST_ERRORS.click();
                Self::request_error(e)
            })?,
        };

        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }

        let byte_stream = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        let events = process_ndjson::<_, ChatResponse>(Box::pin(byte_stream));
        futures::pin_mut!(events);

        let mut first_event = true;
        loop {
            let event = tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(Error::cancelled("chat request cancelled"));
                }
                event = events.next() => event,
            };
            match event {
                Some(Ok(event)) => {
                    STREAM_EVENTS.click();
                    if first_event {
                        STREAM_TTFB.add(start.elapsed().as_secs_f64());
                        first_event = false;
                    }
                    let done = event.done;
                    on_event(event)?;
                    if done {
                        STREAM_DURATION.add(start.elapsed().as_secs_f64());
                        return Ok(());
                    }
                }
                Some(Err(e)) => {
                    STREAM_ERRORS.click();
                    return Err(e);
                }
                None => {
                    STREAM_DURATION.add(start.elapsed().as_secs_f64());
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_host() {
        let client = Client::with_host(Some(DEFAULT_HOST.to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://127.0.0.1:11434/");
    }

    #[test]
    fn host_without_scheme() {
        let client = Client::with_host(Some("localhost:11434".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:11434/");
    }

    #[test]
    fn host_gains_trailing_slash() {
        let client = Client::with_host(Some("http://example.com/server".to_string())).unwrap();
        assert_eq!(client.base_url().as_str(), "http://example.com/server/");
        assert_eq!(
            client.endpoint("api/chat").unwrap().as_str(),
            "http://example.com/server/api/chat"
        );
    }

    #[test]
    fn invalid_host_rejected() {
        let err = Client::with_host(Some("http://".to_string())).unwrap_err();
        assert!(matches!(err, Error::Url { .. }));
    }

    #[tokio::test]
    async fn chat_observes_prior_cancellation() {
        let client = Client::with_host(Some("http://127.0.0.1:1".to_string())).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let request = ChatRequest {
            model: "test".to_string(),
            ..Default::default()
        };
        let err = client.chat(&request, &cancel, |_| Ok(())).await.unwrap_err();
        assert!(err.is_cancelled());
    }
}
