//! Wire types for the CarIn fleet API gateway
//!
//! - `api`: request and response bodies, one module per endpoint group
//! - `common`: resources and claims shared across endpoints

pub mod api;
pub mod common;

pub use api::{auth::*, fleet::*};
pub use common::{auth::*, fleet::*, pagination::*};

#[cfg(test)]
mod tests {
    use super::{Claims, Identity, ListQuery, LoginRequest, Paginated, RouteStatus, User};

    #[test]
    fn test_root_exposes_wire_types_once() {
        let claims: Claims = serde_json::from_value(serde_json::json!({
            "id": "u-1",
            "email": "ana.silva@carin.pt",
            "firstName": "Ana",
            "lastName": "Silva",
            "role": "admin",
            "exp": 1_900_000_000
        }))
        .unwrap();
        assert_eq!(Identity::from(&claims).full_name(), "Ana Silva");

        let page: Paginated<User> = serde_json::from_value(serde_json::json!({
            "data": [],
            "meta": { "totalItems": 0 }
        }))
        .unwrap();
        assert!(page.data.is_empty());

        let query = ListQuery::page(2, 5);
        assert!(query.to_params("status").contains(&("page".to_string(), "2".to_string())));
        assert_eq!(RouteStatus::InProgress.to_string(), "In Progress");

        let login = LoginRequest {
            email: "ana.silva@carin.pt".to_string(),
            password: "hunter2".to_string(),
        };
        assert_eq!(login.email, claims.email);
    }
}
