//! Session lifecycle: login, logout, status and background renewal

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use validator::Validate;

use carin_protocol::{Identity, LoginRequest, LoginResponse};

use crate::coordinator::RefreshCoordinator;
use crate::error::{CarinError, Result};
use crate::store::{CredentialStore, StoredCredential};
use crate::token;
use crate::transport::{ApiRequest, Transport};

pub const LOGIN_ENDPOINT: &str = "/auth/login";

/// How often the admin front-end re-checks its session in the background
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5 * 60);

/// Snapshot of the stored session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub identity: Option<Identity>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Seconds of access token lifetime left; negative once expired
    pub remaining_secs: Option<i64>,
    /// The next request will renew first
    pub renewal_due: bool,
}

impl SessionStatus {
    fn signed_out() -> Self {
        Self {
            authenticated: false,
            identity: None,
            expires_at: None,
            remaining_secs: None,
            renewal_due: false,
        }
    }
}

/// Authentication service
#[derive(Debug)]
pub struct AuthService<T> {
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T: Transport> AuthService<T> {
    pub fn new(coordinator: Arc<RefreshCoordinator<T>>) -> Self {
        Self { coordinator }
    }

    fn store(&self) -> &Arc<CredentialStore> {
        self.coordinator.store()
    }

    /// Exchange email and password for a session and remember it
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        // Sent without a bearer: whatever is stored is about to be replaced
        let response = self
            .coordinator
            .transport()
            .send(ApiRequest::post(LOGIN_ENDPOINT).json(&request)?)
            .await?;

        if !response.is_success() {
            warn!(status = response.status, "login rejected");
            return Err(CarinError::authentication(response.error_message()));
        }

        let tokens: LoginResponse = response.into_json()?;
        let identity = token::identity(&tokens.token).map_err(|e| {
            CarinError::authentication(format!("Server issued an unreadable token: {}", e.message()))
        })?;

        self.store()
            .set(StoredCredential::new(tokens.token, tokens.refresh_token))?;

        info!(user = %identity.email, role = %identity.role, "logged in");
        Ok(identity)
    }

    /// Forget the session. Nothing is sent to the gateway.
    pub fn logout(&self) -> Result<()> {
        let had_session = self.store().has_credential();
        self.store().clear()?;
        if had_session {
            info!("logged out");
        }
        Ok(())
    }

    /// Who is logged in, read from the stored access token
    pub fn current_identity(&self) -> Result<Option<Identity>> {
        let Some(credential) = self.store().get() else {
            return Ok(None);
        };

        match token::identity(&credential.access_token) {
            Ok(identity) => Ok(Some(identity)),
            Err(err) => Err(self.discard_corrupt(&credential, err)),
        }
    }

    pub fn status(&self) -> Result<SessionStatus> {
        let Some(credential) = self.store().get() else {
            return Ok(SessionStatus::signed_out());
        };

        let now = Utc::now();
        let validity = token::check(
            &credential.access_token,
            now,
            self.coordinator.refresh_window(),
        )
        .map_err(|err| self.discard_corrupt(&credential, err))?;

        Ok(SessionStatus {
            authenticated: true,
            remaining_secs: Some(validity.remaining_secs(now)),
            expires_at: Some(validity.expires_at),
            identity: validity.identity,
            renewal_due: !validity.valid,
        })
    }

    fn discard_corrupt(&self, credential: &StoredCredential, err: CarinError) -> CarinError {
        warn!(error = %err, "stored access token is unreadable, ending session");
        if let Err(clear_err) = self.store().clear_if(&credential.refresh_token) {
            warn!(error = %clear_err, "failed to clear corrupt credential");
        }
        err
    }
}

/// Background task renewing the session ahead of expiry
///
/// The task stops when this handle is dropped.
#[derive(Debug)]
pub struct RefreshTicker {
    handle: JoinHandle<()>,
}

impl RefreshTicker {
    /// Stop the task now instead of at end of scope
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Call `ensure_fresh` every `period` until the session is gone for good
pub fn spawn_refresh_ticker<T>(
    coordinator: Arc<RefreshCoordinator<T>>,
    period: Duration,
) -> RefreshTicker
where
    T: Transport + 'static,
{
    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match coordinator.ensure_fresh().await {
                Ok(()) => debug!("session check complete"),
                Err(err) if err.requires_logout() => {
                    warn!(error = %err, "session ended, stopping refresh ticker");
                    break;
                }
                Err(err) => warn!(error = %err, "session check failed, will retry"),
            }
        }
    });

    RefreshTicker { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::REFRESH_ENDPOINT;
    use crate::tests::mocks::{MockReply, MockTransport};
    use crate::tests::utils::test_helpers::{store_with_token, token_expiring_in};
    use reqwest::Method;
    use serde_json::json;

    fn service(transport: &MockTransport, store: Arc<CredentialStore>) -> AuthService<MockTransport> {
        AuthService::new(Arc::new(RefreshCoordinator::new(transport.clone(), store)))
    }

    #[tokio::test]
    async fn test_login_stores_tokens_and_returns_identity() {
        let transport = MockTransport::new();
        let issued = token_expiring_in(3600);
        transport.on(
            Method::POST,
            LOGIN_ENDPOINT,
            MockReply::json(201, json!({"token": issued, "refreshToken": "refresh-9"})),
        );
        let store = Arc::new(CredentialStore::in_memory());
        let auth = service(&transport, Arc::clone(&store));

        let identity = auth.login(" ana.silva@carin.pt ", "hunter2").await.unwrap();
        assert_eq!(identity.full_name(), "Ana Silva");
        assert_eq!(identity.role, "admin");

        let stored = store.get().unwrap();
        assert_eq!(stored.access_token, issued);
        assert_eq!(stored.refresh_token, "refresh-9");

        let sent = transport.requests_to(Method::POST, LOGIN_ENDPOINT);
        assert_eq!(
            sent[0].body,
            Some(json!({"email": "ana.silva@carin.pt", "password": "hunter2"}))
        );
        assert!(sent[0].bearer.is_none());
    }

    #[tokio::test]
    async fn test_login_rejection_surfaces_server_message() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            LOGIN_ENDPOINT,
            MockReply::json(401, json!({"message": "Invalid credentials"})),
        );
        let store = Arc::new(CredentialStore::in_memory());
        let auth = service(&transport, Arc::clone(&store));

        let err = auth.login("ana.silva@carin.pt", "wrong").await.unwrap_err();
        assert!(matches!(err, CarinError::Authentication { .. }));
        assert_eq!(err.message(), "Invalid credentials");
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn test_login_validates_before_sending() {
        let transport = MockTransport::new();
        let auth = service(&transport, Arc::new(CredentialStore::in_memory()));

        let err = auth.login("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, CarinError::Validation { .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_login_during_rejected_renewal_survives() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            REFRESH_ENDPOINT,
            MockReply::json(401, json!({"message": "Invalid refresh token"})),
        );
        transport.delay(Method::POST, REFRESH_ENDPOINT, Duration::from_millis(80));
        transport.on(Method::GET, "/routes", MockReply::json(200, json!({"data": []})));
        let issued = token_expiring_in(3600);
        transport.on(
            Method::POST,
            LOGIN_ENDPOINT,
            MockReply::json(201, json!({"token": issued, "refreshToken": "refresh-9"})),
        );
        let store = store_with_token(&token_expiring_in(20), "refresh-1");
        let auth = service(&transport, Arc::clone(&store));

        let relogin = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            auth.login("ana.silva@carin.pt", "hunter2").await
        };
        let (renewal, login) = tokio::join!(
            auth.coordinator.request(ApiRequest::get("/routes")),
            relogin
        );

        assert!(renewal.is_err());
        assert!(login.is_ok());
        let stored = store.get().unwrap();
        assert_eq!(stored.access_token, issued);
        assert_eq!(stored.refresh_token, "refresh-9");
        assert!(auth.status().unwrap().authenticated);
    }

    #[tokio::test]
    async fn test_logout_clears_store() {
        let transport = MockTransport::new();
        let store = store_with_token(&token_expiring_in(3600), "r");
        let auth = service(&transport, Arc::clone(&store));

        auth.logout().unwrap();
        assert!(store.get().is_none());
        assert!(auth.current_identity().unwrap().is_none());
        assert!(!auth.status().unwrap().authenticated);
    }

    #[test]
    fn test_status_reports_renewal_due() {
        let transport = MockTransport::new();

        let fresh = service(&transport, store_with_token(&token_expiring_in(3600), "r"))
            .status()
            .unwrap();
        assert!(fresh.authenticated);
        assert!(!fresh.renewal_due);
        assert!(fresh.remaining_secs.unwrap() > 3500);
        assert_eq!(fresh.identity.unwrap().email, "ana.silva@carin.pt");

        let stale = service(&transport, store_with_token(&token_expiring_in(20), "r"))
            .status()
            .unwrap();
        assert!(stale.renewal_due);
    }

    #[test]
    fn test_corrupt_token_clears_session() {
        let transport = MockTransport::new();
        let store = store_with_token("definitely.not.jwt", "r");
        let auth = service(&transport, Arc::clone(&store));

        let err = auth.current_identity().unwrap_err();
        assert!(matches!(err, CarinError::Decode { .. }));
        assert!(store.get().is_none());
    }

    #[tokio::test]
    async fn test_ticker_renews_ahead_of_expiry() {
        let transport = MockTransport::new();
        transport.on(Method::POST, REFRESH_ENDPOINT, MockReply::FreshToken { lifetime_secs: 3600 });
        let original = token_expiring_in(30);
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store_with_token(&original, "r"),
        ));

        let ticker = spawn_refresh_ticker(Arc::clone(&coordinator), Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(transport.count(Method::POST, REFRESH_ENDPOINT), 1);
        assert_ne!(coordinator.store().get().unwrap().access_token, original);
        assert!(!ticker.is_finished());
        ticker.stop();
    }

    #[tokio::test]
    async fn test_ticker_stops_when_dropped() {
        let transport = MockTransport::new();
        transport.on(Method::POST, REFRESH_ENDPOINT, MockReply::FreshToken { lifetime_secs: 3600 });
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            Arc::new(CredentialStore::in_memory()),
        ));

        let ticker = spawn_refresh_ticker(Arc::clone(&coordinator), Duration::from_millis(10));
        drop(ticker);
        tokio::task::yield_now().await;

        coordinator
            .store()
            .set(StoredCredential::new(token_expiring_in(5), "r"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(transport.count(Method::POST, REFRESH_ENDPOINT), 0);
    }

    #[tokio::test]
    async fn test_ticker_exits_after_rejected_renewal() {
        let transport = MockTransport::new();
        transport.on(
            Method::POST,
            REFRESH_ENDPOINT,
            MockReply::json(403, json!({"message": "Refresh token expired"})),
        );
        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store_with_token(&token_expiring_in(5), "r"),
        ));

        let ticker = spawn_refresh_ticker(Arc::clone(&coordinator), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(ticker.is_finished());
        assert!(coordinator.store().get().is_none());
        assert_eq!(transport.count(Method::POST, REFRESH_ENDPOINT), 1);
    }
}
