use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient as BackendHttpClient, HttpClientError};
use http::Response as HttpResponse;
use http::{Request, Response};
use reqwest::Proxy;
use reqwest::blocking::{Client, Response as BlockingResponse};

/// Blocking reqwest client used to reach the backend endpoints.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, HttpBuildError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout).connect_timeout(timeout);
        }

        if !config.proxy.url().is_empty() {
            let proxy = Proxy::all(config.proxy.url().to_string())
                .map_err(|err| HttpBuildError::InvalidProxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }

    fn send(&self, request: Request<Vec<u8>>) -> Result<HttpResponse<Vec<u8>>, HttpResponseError> {
        let req = self
            .client
            .request(request.method().clone(), request.uri().to_string().as_str())
            .headers(request.headers().clone())
            .body(request.body().to_vec());

        let res = req
            .send()
            .map_err(|err| HttpResponseError::TransportError(err.to_string()))?;

        try_build_response(res)
    }
}

fn try_build_response(res: BlockingResponse) -> Result<HttpResponse<Vec<u8>>, HttpResponseError> {
    let status = res.status();
    let version = res.version();

    // Raw bytes are never decoded here, so a failing read means the connection broke.
    let body: Vec<u8> = res
        .bytes()
        .map_err(|err| HttpResponseError::ReadingResponse(err.to_string()))?
        .into();

    http::Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpResponseError::BuildingResponse(err.to_string()))
}

impl BackendHttpClient for HttpClient {
    fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError> {
        let response = self.send(req)?;

        Ok(response)
    }
}

impl From<HttpResponseError> for HttpClientError {
    fn from(err: HttpResponseError) -> Self {
        match err {
            HttpResponseError::TransportError(msg) | HttpResponseError::ReadingResponse(msg) => {
                HttpClientError::TransportError(msg)
            }
            HttpResponseError::BuildingResponse(msg) => HttpClientError::InvalidResponse(msg),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
    #[error("invalid proxy configuration: {0}")]
    InvalidProxy(String),
}

#[derive(thiserror::Error, Debug)]
enum HttpResponseError {
    #[error("could not read response body: {0}")]
    ReadingResponse(String),
    #[error("could not build response: {0}")]
    BuildingResponse(String),
    #[error("http transport error: `{0}`")]
    TransportError(String),
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::http::config::ProxyConfig;
    use assert_matches::assert_matches;
    use httpmock::{Method::GET, MockServer};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn forwards_method_headers_and_returns_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/public")
                .header("authorization", "Bearer abc");
            then.status(200).body("hello");
        });

        let client = HttpClient::new(HttpConfig::default()).unwrap();
        let request = Request::get(server.url("/api/v1/public"))
            .header("authorization", "Bearer abc")
            .body(vec![])
            .unwrap();

        let response = BackendHttpClient::send(&client, request).unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), b"hello");
        mock.assert();
    }

    #[test]
    fn error_statuses_are_responses_not_errors() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/admin");
            then.status(403);
        });

        let client = HttpClient::new(HttpConfig::default()).unwrap();
        let request = Request::get(server.url("/api/v1/admin"))
            .body(vec![])
            .unwrap();

        let response = BackendHttpClient::send(&client, request).unwrap();

        assert_eq!(response.status(), 403);
        mock.assert();
    }

    #[test]
    fn timeout_is_a_transport_error() {
        let timeout = Duration::from_millis(10);
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/user");
            then.status(200)
                .delay(timeout.saturating_add(Duration::from_millis(50)));
        });

        let client =
            HttpClient::new(HttpConfig::new(Some(timeout), ProxyConfig::default())).unwrap();
        let request = Request::get(server.url("/api/v1/user"))
            .body(vec![])
            .unwrap();

        let error = BackendHttpClient::send(&client, request).unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(_));
        mock.assert();
    }

    #[test]
    fn connection_closed_mid_body_is_a_transport_error() {
        let url = serve_truncated_body();
        let client = HttpClient::new(HttpConfig::default()).unwrap();
        let request = Request::get(url).body(vec![]).unwrap();

        let error = BackendHttpClient::send(&client, request).unwrap_err();

        assert_matches!(error, HttpClientError::TransportError(msg) => {
            assert!(msg.contains("could not read response body"));
        });
    }

    /// Serves a single response announcing more body bytes than it sends, then hangs up.
    pub(crate) fn serve_truncated_body() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\npartial");
            let _ = stream.flush();
        });
        format!("http://{addr}/api/v1/public")
    }
}
