// API call façade: one authenticated POST per call, classified into a result
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::classify::classify_response;
use crate::config::{ClientConfig, Credentials};
use crate::deferred::Deferred;
use crate::error::Result;
use crate::node::Node;
use crate::request::{build_request, ApiRequest};
use crate::transport::{ReqwestTransport, Transport};

struct ClientInner {
    credentials: Credentials,
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

/// Client for one product of the billing service.
///
/// Cheap to clone; clones share the same credentials and transport. The
/// client holds no mutable state, so any number of calls may be in flight
/// at once.
#[derive(Clone)]
pub struct CheddarClient {
    inner: Arc<ClientInner>,
}

impl CheddarClient {
    /// Creates a client over HTTPS, reading host and port overrides from the
    /// environment.
    pub fn new(username: &str, secret: &str, product_code: impl Into<String>) -> Result<Self> {
        let config = ClientConfig::from_env()?;
        Ok(Self::with_transport(
            Credentials::new(username, secret, product_code),
            config,
            Arc::new(ReqwestTransport::new()),
        ))
    }

    pub fn with_config(
        username: &str,
        secret: &str,
        product_code: impl Into<String>,
        config: ClientConfig,
    ) -> Self {
        Self::with_transport(
            Credentials::new(username, secret, product_code),
            config,
            Arc::new(ReqwestTransport::new()),
        )
    }

    pub fn with_transport(
        credentials: Credentials,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                credentials,
                config,
                transport,
            }),
        }
    }

    pub fn product_code(&self) -> &str {
        self.inner.credentials.product_code()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Sends one request and classifies the answer.
    ///
    /// Accepts a bare path (no body) or an [`ApiRequest`] carrying form data.
    /// Yields `Ok(None)` when the service answered with an empty body.
    pub fn call(&self, request: impl Into<ApiRequest>) -> Deferred<Option<Node>> {
        let request = request.into();
        let descriptor = build_request(&self.inner.credentials, &self.inner.config, &request);
        let transport = self.inner.transport.clone();

        Deferred::new(async move {
            debug!(
                "Calling {} with {} form fields",
                descriptor.path,
                request.data.as_ref().map_or(0, |data| data.fields().len())
            );
            let outcome = transport.send(descriptor).await;
            classify_response(outcome)
        })
    }
}

impl fmt::Debug for CheddarClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheddarClient")
            .field("credentials", &self.inner.credentials)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
