// HTTP transport behind a trait so the pipeline can run without a network
use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::TransportError;
use crate::request::{RequestDescriptor, CONTENT_LENGTH};

// Status plus the fully buffered body
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status_code: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status_code: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status_code,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    // Sends one request; a single attempt, no retries
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError>;
}

/// Default transport over `reqwest`. No timeout is set here.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: RequestDescriptor) -> Result<TransportResponse, TransportError> {
        let url = request.url();
        let mut builder = self.client.post(&url);

        for (name, value) in &request.headers {
            // reqwest derives the length from the body it is given
            if name.eq_ignore_ascii_case(CONTENT_LENGTH) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::NetworkError(e.to_string()))?;
        let status_code = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::NetworkError(e.to_string()))?;

        debug!("POST {} -> {} ({} bytes)", request.path, status_code, body.len());

        Ok(TransportResponse { status_code, body })
    }
}

// In-memory transport for tests
#[cfg(test)]
pub mod mock_transport {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Debug, Clone)]
    pub enum MockReply {
        Respond(TransportResponse),
        Fail(TransportError),
    }

    pub struct MockTransport {
        replies: Mutex<HashMap<String, MockReply>>,
        delays: Mutex<HashMap<String, Duration>>,
        requests: Mutex<Vec<RequestDescriptor>>,
        request_count: AtomicUsize,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                replies: Mutex::new(HashMap::new()),
                delays: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
                request_count: AtomicUsize::new(0),
            }
        }

        // Registers a reply for an exact encoded request path (including /xml)
        pub async fn respond(&self, path: &str, status_code: u16, body: &str) {
            self.replies.lock().await.insert(
                path.to_string(),
                MockReply::Respond(TransportResponse::new(status_code, body.to_string())),
            );
        }

        pub async fn fail(&self, path: &str, error: TransportError) {
            self.replies
                .lock()
                .await
                .insert(path.to_string(), MockReply::Fail(error));
        }

        pub async fn delay(&self, path: &str, delay: Duration) {
            self.delays.lock().await.insert(path.to_string(), delay);
        }

        pub async fn requests(&self) -> Vec<RequestDescriptor> {
            self.requests.lock().await.clone()
        }

        pub async fn last_request(&self) -> Option<RequestDescriptor> {
            self.requests.lock().await.last().cloned()
        }

        pub fn request_count(&self) -> usize {
            self.request_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            request: RequestDescriptor,
        ) -> Result<TransportResponse, TransportError> {
            self.request_count.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().await.push(request.clone());

            let delay = self.delays.lock().await.get(&request.path).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let reply = self.replies.lock().await.get(&request.path).cloned();
            match reply {
                Some(MockReply::Respond(response)) => Ok(response),
                Some(MockReply::Fail(error)) => Err(error),
                None => Ok(TransportResponse::new(
                    404,
                    format!("no mock registered for {}", request.path),
                )),
            }
        }
    }
}
