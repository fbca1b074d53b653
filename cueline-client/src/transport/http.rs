use async_trait::async_trait;
use cueline_core::Config;
use log::debug;
use reqwest::{Client, RequestBuilder, Url};

use super::{ApiRequest, ApiResponse, Authorization, Method, Transport, TransportError};

/// Sends requests to the queue server over http
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.normalized_server_url())
            .map_err(|e| TransportError::Other(format!("Invalid server url: {e}")))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    fn build(&self, request: &ApiRequest) -> Result<RequestBuilder, TransportError> {
        let url = self
            .base_url
            .join(&request.endpoint.path())
            .map_err(|e| TransportError::Other(e.to_string()))?;

        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Delete => self.client.delete(url),
        };

        builder = match &request.authorization {
            Some(Authorization::Bearer(token)) => builder.bearer_auth(token),
            Some(Authorization::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            None => builder,
        };

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        debug!("{} {}", request.method, request.endpoint.path());

        let response = self
            .build(&request)?
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify)?;

        Ok(ApiResponse { status, body })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Endpoint;

    #[test]
    fn test_builds_relative_urls() {
        let config = Config {
            server_url: "http://localhost:9000/api".to_string(),
            ..Default::default()
        };

        let transport = HttpTransport::new(&config).unwrap();
        let request = transport
            .build(&ApiRequest::delete(Endpoint::Song("abc".to_string())))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:9000/api/queue/abc");
        assert_eq!(request.method(), reqwest::Method::DELETE);
    }

    #[test]
    fn test_invalid_server_url() {
        let config = Config {
            server_url: "not a url".to_string(),
            ..Default::default()
        };

        assert!(HttpTransport::new(&config).is_err());
    }
}
