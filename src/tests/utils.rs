//! Test utilities and helpers for unit tests
//!
//! This module provides common testing utilities including:
//! - Signed access tokens with chosen expiry
//! - Credential stores pre-loaded with a session
//! - Gateway payloads for users, vehicles and routes

#[cfg(test)]
pub mod test_helpers {
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    use carin_protocol::Claims;

    use crate::store::{CredentialStore, StoredCredential};

    const SIGNING_SECRET: &[u8] = b"carin-test-secret";

    /// Create a temporary directory for testing
    pub fn create_temp_dir() -> TempDir {
        tempfile::tempdir().expect("Failed to create temp dir")
    }

    /// Claims for the fixture administrator, expiring at `exp`
    pub fn claims_expiring_at(exp: i64) -> Claims {
        Claims {
            id: "6650f1c2a1b2c3d4e5f60718".to_string(),
            email: "ana.silva@carin.pt".to_string(),
            first_name: "Ana".to_string(),
            last_name: "Silva".to_string(),
            role: "admin".to_string(),
            exp,
        }
    }

    /// HS256 compact JWS over `claims`
    pub fn sign_claims(claims: &Claims) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(SIGNING_SECRET),
        )
        .expect("Failed to sign test token")
    }

    /// Token whose `exp` is `secs` from now; negative for already expired
    pub fn token_expiring_in(secs: i64) -> String {
        sign_claims(&claims_expiring_at(Utc::now().timestamp() + secs))
    }

    /// In-memory store holding the given pair
    pub fn store_with_token(access_token: &str, refresh_token: &str) -> Arc<CredentialStore> {
        let store = CredentialStore::in_memory();
        store
            .set(StoredCredential::new(access_token, refresh_token))
            .expect("Failed to seed store");
        Arc::new(store)
    }

    pub fn user_json(id: &str, role: &str) -> Value {
        json!({
            "_id": id,
            "firstName": "João",
            "lastName": "Pereira",
            "email": format!("{}@carin.pt", id),
            "role": role,
            "imageUrl": null
        })
    }

    pub fn vehicle_json(id: &str, status: &str) -> Value {
        json!({
            "_id": id,
            "model": "Model 3",
            "brand": "Tesla",
            "licensePlate": "AA-00-BB",
            "vin": "5YJ3E1EA7KF317000",
            "color": "White",
            "registerDate": "2021-03-10T00:00:00.000Z",
            "acquisitionDate": "2021-04-01T00:00:00.000Z",
            "category": "Sedan",
            "kms": 48210.5,
            "capacity": 5,
            "fuelType": "electric",
            "averageFuelConsumption": 15.2,
            "status": status,
            "isDeleted": false,
            "createdAt": "2021-04-01T09:30:00.000Z",
            "updatedAt": "2024-02-11T17:05:00.000Z"
        })
    }

    pub fn route_json(id: &str, status: &str) -> Value {
        json!({
            "_id": id,
            "userId": "u-1",
            "vehicleId": "v-1",
            "startPoint": { "city": "Porto", "country": "Portugal", "coordinates": [41.15, -8.61] },
            "endPoint": { "city": "Lisboa", "country": "Portugal", "coordinates": [38.72, -9.14] },
            "startDate": "2024-05-01T08:00:00.000Z",
            "estimatedEndDate": "2024-05-01T11:10:00.000Z",
            "distance": 313.4,
            "duration": "3h 10m",
            "status": status,
            "avoidTolls": false,
            "avoidHighways": true,
            "isDeleted": false,
            "createdAt": "2024-04-20T10:00:00.000Z",
            "updatedAt": "2024-04-20T10:00:00.000Z"
        })
    }

    /// List payload with pagination metadata
    pub fn page_json(items: Vec<Value>, total_items: u64, page: u64, per_page: u64) -> Value {
        let item_count = items.len();
        json!({
            "data": items,
            "meta": {
                "totalItems": total_items,
                "itemCount": item_count,
                "itemsPerPage": per_page,
                "totalPages": total_items.div_ceil(per_page.max(1)),
                "currentPage": page
            }
        })
    }
}
