//! HTTP transport for the tracking service.
//!
//! Every request is a form-encoded POST against one of the fixed
//! [`Endpoint`]s. There is no retry here: a failed request fails the
//! current sync cycle and the scheduler interval acts as the retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use syncloc_telemetry_models::{Employee, LocationRecord, WorkArea, WorkSite};

use crate::{Endpoint, TelemetryError, TelemetrySource, envelope};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Connection settings for [`RemoteClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientOptions {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Idle keep-alive connections kept per host.
    pub max_idle_per_host: usize,
    /// How long an idle connection stays in the pool.
    pub idle_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_idle_per_host: 10,
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// [`TelemetrySource`] backed by the remote service.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteClient {
    /// Creates a client for the service at `base_url` (scheme, host and
    /// optional path prefix, without a trailing slash).
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn new(base_url: &str, options: ClientOptions) -> Result<Self, TelemetryError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .user_agent("syncloc/1.0")
            .timeout(options.timeout)
            .pool_max_idle_per_host(options.max_idle_per_host)
            .pool_idle_timeout(options.idle_timeout)
            .build()
            .map_err(|source| TelemetryError::Transport {
                endpoint: base_url.clone(),
                source,
            })?;

        Ok(Self { client, base_url })
    }

    /// Base address requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends the request for `endpoint` and decodes its `result` list.
    ///
    /// # Errors
    ///
    /// * [`TelemetryError::Transport`] on connection, timeout, or body read
    ///   failure.
    /// * [`TelemetryError::Protocol`] on a non-success HTTP status, a
    ///   malformed envelope, or a failure `Code`.
    /// * [`TelemetryError::Decode`] if `result` has the wrong shape.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
    ) -> Result<Vec<T>, TelemetryError> {
        let path = endpoint.path();
        let url = format!("{}{path}", self.base_url);
        let transport = |source| TelemetryError::Transport {
            endpoint: path.to_string(),
            source,
        };

        log::debug!("http-request: {url}");
        log::debug!("http-request-params: {}", endpoint.form_body());

        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(endpoint.form_body())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(TelemetryError::Protocol {
                endpoint: path.to_string(),
                message: format!("HTTP {status}: {body}"),
            });
        }

        log::trace!("http-response: {body}");

        envelope::decode_response(path, &body)
    }
}

#[async_trait]
impl TelemetrySource for RemoteClient {
    async fn fetch_locations(&self) -> Result<Vec<LocationRecord>, TelemetryError> {
        self.fetch(Endpoint::Locations).await
    }

    async fn fetch_work_areas(&self) -> Result<Vec<WorkArea>, TelemetryError> {
        self.fetch(Endpoint::WorkAreas).await
    }

    async fn fetch_work_sites(&self) -> Result<Vec<WorkSite>, TelemetryError> {
        self.fetch(Endpoint::WorkSites).await
    }

    async fn fetch_employees(&self) -> Result<Vec<Employee>, TelemetryError> {
        self.fetch(Endpoint::Employees).await
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;

    /// Answers one request with `status` and `body`, returning the base
    /// address and a handle resolving to the raw request text.
    async fn serve_once(status: &'static str, body: String) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: text/xml; charset=utf-8\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            request
        });
        (base, handle)
    }

    async fn read_request(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let length = text[..head_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= head_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    fn wrap(json: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<string xmlns=\"http://tempuri.org/\">{json}</string>"
        )
    }

    #[tokio::test]
    async fn posts_form_body_and_decodes_result() {
        let (base, server) = serve_once(
            "200 OK",
            wrap(r#"{"Code":"1","Message":"","result":[{"cardnum":"C1","devNum":"S1","cardType":"1"}]}"#),
        )
        .await;
        let client = RemoteClient::new(&base, ClientOptions::default()).unwrap();

        let locations = client.fetch_locations().await.unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].card_number, "C1");
        assert_eq!(locations[0].site_code, "S1");

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert_eq!(
            request_line,
            format!("POST {} HTTP/1.1", Endpoint::Locations.path())
        );
        assert!(
            request
                .to_ascii_lowercase()
                .contains("content-type: application/x-www-form-urlencoded"),
            "{request}"
        );
        assert!(request.ends_with("\r\n\r\nCardNum=&CardType="), "{request}");
    }

    #[tokio::test]
    async fn sends_each_endpoint_body() {
        let (base, server) = serve_once(
            "200 OK",
            wrap(r#"{"Code":"1","Message":"","result":[]}"#),
        )
        .await;
        let client = RemoteClient::new(&base, ClientOptions::default()).unwrap();

        assert!(client.fetch_employees().await.unwrap().is_empty());

        let request = server.await.unwrap();
        assert!(request.starts_with(&format!("POST {} ", Endpoint::Employees.path())));
        assert!(request.ends_with(Endpoint::Employees.form_body()), "{request}");
    }

    #[tokio::test]
    async fn error_status_is_protocol_error_with_body() {
        let (base, server) =
            serve_once("500 Internal Server Error", "database offline".to_string()).await;
        let client = RemoteClient::new(&base, ClientOptions::default()).unwrap();

        let err = client.fetch_work_areas().await.unwrap_err();
        match err {
            TelemetryError::Protocol { endpoint, message } => {
                assert_eq!(endpoint, Endpoint::WorkAreas.path());
                assert!(message.contains("500"), "{message}");
                assert!(message.contains("database offline"), "{message}");
            }
            other => panic!("expected protocol error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn failure_code_is_protocol_error() {
        let (base, server) = serve_once(
            "200 OK",
            wrap(r#"{"Code":"0","Message":"no license","result":null}"#),
        )
        .await;
        let client = RemoteClient::new(&base, ClientOptions::default()).unwrap();

        let err = client.fetch_work_sites().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Protocol { .. }), "{err:?}");
        assert!(err.to_string().contains("no license"));
        server.await.unwrap();
    }

    #[test]
    fn trims_trailing_slash_from_base() {
        let client = RemoteClient::new("http://10.0.0.5:8080/", ClientOptions::default()).unwrap();
        assert_eq!(client.base_url(), "http://10.0.0.5:8080");
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let options = ClientOptions {
            timeout: Duration::from_millis(500),
            ..ClientOptions::default()
        };
        // Port 9 (discard) on localhost is closed on any sane test host.
        let client = RemoteClient::new("http://127.0.0.1:9", options).unwrap();
        let err = client.fetch_locations().await.unwrap_err();
        assert!(matches!(err, TelemetryError::Transport { .. }), "{err:?}");
        assert_eq!(err.endpoint(), Endpoint::Locations.path());
    }
}
