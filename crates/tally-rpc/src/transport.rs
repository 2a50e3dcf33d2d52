//! JSON-RPC transport boundary.
//!
//! Everything above this module speaks `invoke(method, params) -> Value`.
//! [`HttpTransport`] implements it over jsonrpsee's HTTP client with basic
//! auth; tests substitute a scripted transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose;
use jsonrpsee::core::ClientError;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder};
use serde_json::Value;
use tracing::trace;

use tally_core::error::RpcError;
use tally_core::types::RpcEndpoint;

/// Default per-request timeout for daemon calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// A request/response channel to one daemon.
///
/// Implementations must not retry; a failed call is reported once.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError>;
}

/// Builds a transport for a resolved endpoint.
pub trait Connector: Send + Sync {
    fn connect(&self, endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcTransport>, RpcError>;
}

/// jsonrpsee-backed HTTP transport.
pub struct HttpTransport {
    client: HttpClient,
    url: String,
}

impl HttpTransport {
    /// Build a client for `endpoint`, sending basic auth on every request.
    pub fn new(endpoint: &RpcEndpoint, timeout: Duration) -> Result<Self, RpcError> {
        let token = format!("{}:{}", endpoint.username, endpoint.password);
        let auth = HeaderValue::from_str(&format!(
            "Basic {}",
            general_purpose::STANDARD.encode(token)
        ))
        .map_err(|e| RpcError::Transport(format!("auth header encode: {e}")))?;

        let mut headers = HeaderMap::new();
        headers.insert("Authorization", auth);

        let url = endpoint.url();
        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(timeout)
            .build(&url)
            .map_err(|e| RpcError::Transport(format!("failed to build client for {url}: {e}")))?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let mut array = ArrayParams::new();
        for p in params {
            array
                .insert(p)
                .map_err(|e| RpcError::Decode(format!("{method} params: {e}")))?;
        }
        trace!(url = %self.url, method, "rpc request");
        self.client
            .request::<Value, _>(method, array)
            .await
            .map_err(|e| map_client_error(method, e))
    }
}

/// Classify a jsonrpsee failure into the daemon/transport split.
fn map_client_error(method: &str, err: ClientError) -> RpcError {
    match err {
        ClientError::Call(obj) => RpcError::Daemon {
            code: i64::from(obj.code()),
            message: obj.message().to_string(),
        },
        ClientError::ParseError(e) => RpcError::Decode(format!("{method}: {e}")),
        other => RpcError::Transport(format!("{method}: {other}")),
    }
}

/// Connector producing [`HttpTransport`]s.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    fn connect(&self, endpoint: &RpcEndpoint) -> Result<Arc<dyn RpcTransport>, RpcError> {
        Ok(Arc::new(HttpTransport::new(endpoint, self.timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonrpsee::types::ErrorObjectOwned;

    fn endpoint() -> RpcEndpoint {
        RpcEndpoint {
            host: "127.0.0.1".into(),
            port: 41414,
            username: "user".into(),
            password: "pass".into(),
        }
    }

    #[test]
    fn call_error_maps_to_daemon() {
        let err = ClientError::Call(ErrorObjectOwned::owned(
            -5,
            "Invalid address".to_string(),
            None::<()>,
        ));
        assert_eq!(
            map_client_error("sendrawtransaction", err),
            RpcError::Daemon {
                code: -5,
                message: "Invalid address".into()
            }
        );
    }

    #[test]
    fn timeout_maps_to_transport() {
        let mapped = map_client_error("getinfo", ClientError::RequestTimeout);
        assert!(mapped.is_transport());
    }

    #[tokio::test]
    async fn http_connector_builds_transport() {
        let connector = HttpConnector::default();
        assert!(connector.connect(&endpoint()).is_ok());
    }

    #[tokio::test]
    async fn unreachable_daemon_is_transport_error() {
        let ep = RpcEndpoint {
            port: 1,
            ..endpoint()
        };
        let transport = HttpTransport::new(&ep, Duration::from_secs(2)).unwrap();
        let err = transport.invoke("getinfo", vec![]).await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err}");
    }
}
