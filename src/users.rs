//! User endpoints

use carin_protocol::{ListQuery, Paginated, User};

use crate::client::ApiClient;
use crate::error::{CarinError, Result};
use crate::transport::Transport;

const USERS: &str = "/users";

/// Users list filter key
pub const ROLE_FILTER: &str = "role";

#[derive(Debug, Clone)]
pub struct UserService<T> {
    client: ApiClient<T>,
}

impl<T: Transport> UserService<T> {
    pub fn new(client: &ApiClient<T>) -> Self {
        Self {
            client: client.clone(),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Paginated<User>> {
        self.client.get_json(USERS, query.to_params(ROLE_FILTER)).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CarinError::invalid_input("User id cannot be empty"));
        }
        self.client
            .get_json(&format!("{}/{}", USERS, id), Vec::new())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RefreshCoordinator;
    use crate::store::CredentialStore;
    use crate::tests::mocks::{MockReply, MockTransport};
    use crate::tests::utils::test_helpers::{page_json, store_with_token, token_expiring_in, user_json};
    use reqwest::Method;
    use std::sync::Arc;

    fn service(transport: &MockTransport, store: Arc<CredentialStore>) -> UserService<MockTransport> {
        let client = ApiClient::new(Arc::new(RefreshCoordinator::new(transport.clone(), store)));
        UserService::new(&client)
    }

    #[tokio::test]
    async fn test_list_filters_by_role() {
        let transport = MockTransport::new();
        transport.on(
            Method::GET,
            USERS,
            MockReply::json(200, page_json(vec![user_json("u-1", "driver")], 1, 1, 10)),
        );
        let token = token_expiring_in(3600);
        let users = service(&transport, store_with_token(&token, "r"));

        let page = users
            .list(&ListQuery::default().with_filter("driver"))
            .await
            .unwrap();
        assert_eq!(page.data[0].full_name(), "João Pereira");

        let sent = &transport.requests_to(Method::GET, USERS)[0];
        assert!(sent.query.contains(&("role".to_string(), "driver".to_string())));
        assert_eq!(sent.bearer.as_deref(), Some(token.as_str()));
    }

    #[tokio::test]
    async fn test_list_all_roles_omits_filter() {
        let transport = MockTransport::new();
        transport.on(Method::GET, USERS, MockReply::json(200, page_json(vec![], 0, 1, 10)));
        let users = service(&transport, store_with_token(&token_expiring_in(3600), "r"));

        users
            .list(&ListQuery::default().with_filter("all"))
            .await
            .unwrap();
        let sent = &transport.requests_to(Method::GET, USERS)[0];
        assert!(!sent.query.iter().any(|(k, _)| k == ROLE_FILTER));
    }

    #[tokio::test]
    async fn test_get_user() {
        let transport = MockTransport::new();
        transport.on(Method::GET, "/users/u-4", MockReply::json(200, user_json("u-4", "admin")));
        let users = service(&transport, store_with_token(&token_expiring_in(3600), "r"));

        let user = users.get("u-4").await.unwrap();
        assert_eq!(user.id, "u-4");
        assert_eq!(user.role, "admin");
    }
}
