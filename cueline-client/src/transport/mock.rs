//! A scripted transport for tests

use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;

use super::{ApiRequest, ApiResponse, Endpoint, Transport, TransportError};

type Handler = dyn Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync;

pub struct MockTransport {
    handler: Box<Handler>,
    /// Delays applied to requests to a given endpoint, in the order they are sent
    delays: Mutex<Vec<(Endpoint, VecDeque<Duration>)>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, TransportError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            delays: Default::default(),
            requests: Default::default(),
        }
    }

    /// Delays the next requests to the endpoint, one delay per request
    pub fn delay(&self, endpoint: Endpoint, delays: Vec<Duration>) {
        self.delays.lock().push((endpoint, delays.into()));
    }

    /// Returns every request sent so far
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }

    /// Returns how many requests were sent to the endpoint
    pub fn count(&self, endpoint: &Endpoint) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| &r.endpoint == endpoint)
            .count()
    }

    fn next_delay(&self, endpoint: &Endpoint) -> Option<Duration> {
        self.delays
            .lock()
            .iter_mut()
            .find(|(e, _)| e == endpoint)
            .and_then(|(_, delays)| delays.pop_front())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        self.requests.lock().push(request.clone());

        if let Some(delay) = self.next_delay(&request.endpoint) {
            tokio::time::sleep(delay).await;
        }

        (self.handler)(&request)
    }
}

pub fn ok() -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(200, ""))
}

pub fn json<T: Serialize>(value: &T) -> Result<ApiResponse, TransportError> {
    Ok(ApiResponse::new(
        200,
        serde_json::to_string(value).expect("value is serialized"),
    ))
}

pub fn status(status: u16, message: &str) -> Result<ApiResponse, TransportError> {
    let body = serde_json::json!({
        "httpstatus": status.to_string(),
        "errormessage": message,
        "requesturl": "/api",
    });

    Ok(ApiResponse::new(status, body.to_string()))
}
