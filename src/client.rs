//! Typed JSON client over the refresh coordinator

use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

use crate::coordinator::RefreshCoordinator;
use crate::error::Result;
use crate::store::CredentialStore;
use crate::transport::{ApiRequest, Transport};

/// Authenticated API client shared by the fleet services
///
/// Cloning is cheap; every clone goes through the same coordinator, so they
/// all share one renewal.
#[derive(Debug)]
pub struct ApiClient<T> {
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T> Clone for ApiClient<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(coordinator: Arc<RefreshCoordinator<T>>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator<T>> {
        &self.coordinator
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.coordinator.store()
    }

    pub async fn get_json<R>(&self, path: &str, query: Vec<(String, String)>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.coordinator
            .request(ApiRequest::get(path).with_query(query))
            .await?
            .into_json()
    }

    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.coordinator
            .request(ApiRequest::post(path).json(body)?)
            .await?
            .into_json()
    }

    pub async fn patch_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.coordinator
            .request(ApiRequest::patch(path).json(body)?)
            .await?
            .into_json()
    }

    /// DELETE, ignoring whatever body comes back
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.coordinator.request(ApiRequest::delete(path)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CarinError;
    use crate::tests::mocks::{MockReply, MockTransport};
    use crate::tests::utils::test_helpers::{store_with_token, token_expiring_in};
    use reqwest::Method;
    use serde_json::{json, Value};

    fn client(transport: &MockTransport) -> ApiClient<MockTransport> {
        let store = store_with_token(&token_expiring_in(3600), "refresh");
        ApiClient::new(Arc::new(RefreshCoordinator::new(transport.clone(), store)))
    }

    #[tokio::test]
    async fn test_get_json_sends_query_and_decodes() {
        let transport = MockTransport::new();
        transport.on(Method::GET, "/ping", MockReply::json(200, json!({"ok": true})));

        let body: Value = client(&transport)
            .get_json("/ping", vec![("page".to_string(), "2".to_string())])
            .await
            .unwrap();

        assert_eq!(body, json!({"ok": true}));
        let sent = transport.requests_to(Method::GET, "/ping");
        assert_eq!(sent[0].query, vec![("page".to_string(), "2".to_string())]);
        assert!(sent[0].bearer.is_some());
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_invalid_response() {
        let transport = MockTransport::new();
        transport.on(Method::POST, "/things", MockReply::json(201, json!("created")));

        let result: Result<std::collections::HashMap<String, Value>> = client(&transport)
            .post_json("/things", &json!({"a": 1}))
            .await;
        assert!(matches!(result, Err(CarinError::Api { status: 0, .. })));
    }

    #[tokio::test]
    async fn test_delete_tolerates_empty_body() {
        let transport = MockTransport::new();
        transport.on(Method::DELETE, "/things/1", MockReply::json(204, Value::Null));

        client(&transport).delete("/things/1").await.unwrap();
        assert_eq!(transport.count(Method::DELETE, "/things/1"), 1);
    }

    #[tokio::test]
    async fn test_clones_share_the_coordinator() {
        let transport = MockTransport::new();
        let original = client(&transport);
        let copy = original.clone();
        assert!(Arc::ptr_eq(original.coordinator(), copy.coordinator()));
    }
}
