//! Mock implementations for testing

use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{CarinError, Result};
use crate::tests::utils::test_helpers::token_expiring_in;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// Scripted reply for one `METHOD path` pair
#[derive(Debug, Clone)]
pub enum MockReply {
    Json { status: u16, body: Value },
    /// A refresh response carrying a newly signed token
    FreshToken { lifetime_secs: i64 },
    /// Transport-level failure, as if the connection dropped
    Fail(String),
}

impl MockReply {
    pub fn json(status: u16, body: Value) -> Self {
        Self::Json { status, body }
    }
}

/// Transport that replays scripted responses and records every request
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<HashMap<String, MockReply>>>,
    delays: Arc<Mutex<HashMap<String, Duration>>>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

fn route_key(method: &Method, path: &str) -> String {
    format!("{} {}", method, path)
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, method: Method, path: &str, reply: MockReply) {
        self.replies
            .lock()
            .unwrap()
            .insert(route_key(&method, path), reply);
    }

    pub fn delay(&self, method: Method, path: &str, delay: Duration) {
        self.delays
            .lock()
            .unwrap()
            .insert(route_key(&method, path), delay);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, method: Method, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.requests_to(method, path).len()
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let key = route_key(&request.method, &request.path);
        self.requests.lock().unwrap().push(request);

        let delay = self.delays.lock().unwrap().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.replies.lock().unwrap().get(&key).cloned();
        match reply {
            Some(MockReply::Json { status, body }) => Ok(ApiResponse::new(status, body)),
            Some(MockReply::FreshToken { lifetime_secs }) => Ok(ApiResponse::new(
                200,
                json!({ "token": token_expiring_in(lifetime_secs) }),
            )),
            Some(MockReply::Fail(message)) => Err(CarinError::network(message)),
            None => Ok(ApiResponse::new(
                404,
                json!({ "message": format!("no mock for {}", key) }),
            )),
        }
    }
}
