//! Outbound HTTP used to refresh descriptor files.

use std::time::Duration;

use indexmap::IndexMap;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

use crate::settings::HttpSettings;

/// Status and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// The request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// Raised by non-network clients such as test stubs.
    #[error("{0}")]
    Other(String),
}

/// Issues a single GET request.
pub trait HttpClient {
    fn get(&self, url: &Url, headers: &IndexMap<String, String>)
        -> Result<HttpResponse, TransportError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(
        &self,
        url: &Url,
        headers: &IndexMap<String, String>,
    ) -> Result<HttpResponse, TransportError> {
        (**self).get(url, headers)
    }
}

/// Blocking `reqwest` client honouring the configured timeout and user agent.
///
/// Redirects are not followed; a 3xx status is returned to the caller as is.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.clone())
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(
        &self,
        url: &Url,
        headers: &IndexMap<String, String>,
    ) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url.clone())
            .headers(header_map(headers)?)
            .send()
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.bytes().map_err(classify)?.to_vec();
        Ok(HttpResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(error)
    } else {
        TransportError::Request(error)
    }
}

fn header_map(headers: &IndexMap<String, String>) -> Result<HeaderMap, TransportError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let invalid = |reason: String| TransportError::InvalidHeader {
            name: name.clone(),
            reason,
        };
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn test_header_map_accepts_valid_headers() {
        let mut headers = IndexMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("X-Api-Version".to_string(), "2".to_string());

        let map = header_map(&headers).unwrap();
        assert_eq!(map["accept"], "application/json");
        assert_eq!(map["x-api-version"], "2");
    }

    #[test]
    fn test_header_map_rejects_invalid_name() {
        let mut headers = IndexMap::new();
        headers.insert("Bad Header".to_string(), "x".to_string());

        let err = header_map(&headers).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeader { ref name, .. } if name == "Bad Header"));
    }

    #[test]
    fn test_client_builds_from_settings() {
        assert!(ReqwestClient::new(&HttpSettings::default()).is_ok());
    }

    #[test]
    fn test_redirect_status_is_returned_not_followed() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0u8; 1024];
            let _ = stream.read(&mut request).unwrap();
            stream
                .write_all(
                    b"HTTP/1.1 301 Moved Permanently\r\nLocation: /new\r\n\
                      Content-Length: 0\r\nConnection: close\r\n\r\n",
                )
                .unwrap();
        });

        let client = ReqwestClient::new(&HttpSettings::default()).unwrap();
        let url = Url::parse(&format!("http://{addr}/old")).unwrap();
        let response = client.get(&url, &IndexMap::new()).unwrap();
        server.join().unwrap();

        assert_eq!(response.status, 301);
        assert!(response.body.is_empty());
    }
}
