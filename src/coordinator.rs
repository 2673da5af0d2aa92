//! Authenticated request pipeline with single-flight credential renewal
//!
//! Every API call goes through [`RefreshCoordinator::request`]. The
//! coordinator checks the stored access token before each call and, when it is
//! about to expire, renews it exactly once no matter how many calls are in
//! flight:
//!
//! - **Idle**: a usable token is attached and the call is forwarded at once.
//! - **Renewing**: the first caller to see an expiring token becomes the
//!   initiator and performs the refresh exchange. Callers arriving meanwhile
//!   queue a one-shot receiver and wait.
//! - **Settled**: the store is updated (or cleared), the state returns to
//!   idle, and every queued caller receives the same outcome in arrival order.
//!
//! The renewal state sits behind a `std::sync::Mutex` that is never held
//! across an `.await`, so "check pending / set pending" is one critical
//! section even on the multi-threaded runtime.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use carin_protocol::{RefreshTokenRequest, RefreshTokenResponse};

use crate::config::ClientConfig;
use crate::error::{CarinError, Result};
use crate::store::{CredentialStore, StoredCredential};
use crate::token::{self, DEFAULT_REFRESH_WINDOW};
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub const REFRESH_ENDPOINT: &str = "/auth/refreshToken";

const DEFAULT_RENEWAL_TIMEOUT: Duration = Duration::from_secs(10);

type RenewalOutcome = std::result::Result<String, CarinError>;

#[derive(Debug, Default)]
enum RenewalState {
    #[default]
    Idle,
    Renewing {
        waiters: Vec<oneshot::Sender<RenewalOutcome>>,
    },
}

/// What a caller has to do after consulting the credential
enum Ticket {
    /// Forward now, with this token if any
    Ready(Option<String>),
    /// Perform the renewal with this refresh token
    Initiate(String),
    /// Wait for the renewal already in flight
    Wait(oneshot::Receiver<RenewalOutcome>),
}

/// Single choke point for outgoing API calls
#[derive(Debug)]
pub struct RefreshCoordinator<T> {
    transport: T,
    store: Arc<CredentialStore>,
    state: Mutex<RenewalState>,
    refresh_window: Duration,
    renewal_timeout: Duration,
}

impl<T> RefreshCoordinator<T> {
    pub fn new(transport: T, store: Arc<CredentialStore>) -> Self {
        Self {
            transport,
            store,
            state: Mutex::new(RenewalState::Idle),
            refresh_window: DEFAULT_REFRESH_WINDOW,
            renewal_timeout: DEFAULT_RENEWAL_TIMEOUT,
        }
    }

    pub fn from_config(transport: T, store: Arc<CredentialStore>, config: &ClientConfig) -> Self {
        Self::new(transport, store)
            .with_refresh_window(config.refresh_window())
            .with_renewal_timeout(config.renewal_timeout())
    }

    pub fn with_refresh_window(mut self, window: Duration) -> Self {
        self.refresh_window = window;
        self
    }

    pub fn with_renewal_timeout(mut self, timeout: Duration) -> Self {
        self.renewal_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn refresh_window(&self) -> Duration {
        self.refresh_window
    }

    /// Whether a renewal exchange is currently in flight
    pub fn is_renewing(&self) -> bool {
        matches!(*self.lock_state(), RenewalState::Renewing { .. })
    }

    fn lock_state(&self) -> MutexGuard<'_, RenewalState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Finish the pending renewal and hand its outcome to every waiter
    ///
    /// A rejected renewal only clears the store while it still holds the
    /// refresh token that was exchanged.
    fn settle(&self, refresh_token: &str, outcome: &RenewalOutcome) {
        let mut state = self.lock_state();

        if let Err(err) = outcome {
            if err.requires_logout() {
                match self.store.clear_if(refresh_token) {
                    Ok(true) => {}
                    Ok(false) => debug!("session replaced during renewal, keeping it"),
                    Err(clear_err) => {
                        warn!(error = %clear_err, "failed to clear credential after rejected renewal")
                    }
                }
            }
        }

        let waiters = match std::mem::take(&mut *state) {
            RenewalState::Renewing { waiters } => waiters,
            RenewalState::Idle => Vec::new(),
        };
        drop(state);

        match outcome {
            Ok(_) => debug!(waiters = waiters.len(), "renewal settled, resuming waiters"),
            Err(err) => warn!(waiters = waiters.len(), error = %err, "renewal failed"),
        }

        for waiter in waiters {
            // A waiter that gave up has dropped its receiver
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Look at the credential and decide, atomically, what this caller does
    fn acquire(&self) -> Result<Ticket> {
        let mut state = self.lock_state();

        if let RenewalState::Renewing { waiters } = &mut *state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(position = waiters.len(), "renewal in flight, queueing caller");
            return Ok(Ticket::Wait(rx));
        }

        let Some(credential) = self.store.get() else {
            return Ok(Ticket::Ready(None));
        };

        let validity = match token::check(&credential.access_token, Utc::now(), self.refresh_window)
        {
            Ok(validity) => validity,
            Err(err) => {
                warn!(error = %err, "stored access token is unreadable, ending session");
                if let Err(clear_err) = self.store.clear_if(&credential.refresh_token) {
                    warn!(error = %clear_err, "failed to clear corrupt credential");
                }
                return Err(err);
            }
        };

        if validity.valid {
            return Ok(Ticket::Ready(Some(credential.access_token)));
        }

        debug!(expires_at = %validity.expires_at, "access token expiring, starting renewal");
        *state = RenewalState::Renewing {
            waiters: Vec::new(),
        };
        Ok(Ticket::Initiate(credential.refresh_token))
    }
}

/// Settles the renewal as failed if the initiator is dropped mid-exchange
struct SettleGuard<'a, T> {
    coordinator: &'a RefreshCoordinator<T>,
    refresh_token: &'a str,
    armed: bool,
}

impl<T> SettleGuard<'_, T> {
    fn settle(mut self, outcome: &RenewalOutcome) {
        self.armed = false;
        self.coordinator.settle(self.refresh_token, outcome);
    }
}

impl<T> Drop for SettleGuard<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.coordinator.settle(
                self.refresh_token,
                &Err(CarinError::renewal_failed_transient(
                    "renewal was cancelled before it completed",
                )),
            );
        }
    }
}

impl<T: Transport> RefreshCoordinator<T> {
    /// Send `request` with a usable access token attached
    ///
    /// Non-2xx responses become `CarinError::Api` carrying the server
    /// message. Nothing is retried, and a 401 is not treated as a renewal
    /// trigger.
    pub async fn request(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        request.bearer = self.access_token().await?;

        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = request.bearer.is_some(),
            "forwarding request"
        );

        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(CarinError::api(response.status, response.error_message()))
        }
    }

    /// A token that is valid for at least the refresh window, renewing first
    /// if needed. `None` when nobody is logged in.
    pub async fn access_token(&self) -> Result<Option<String>> {
        match self.acquire()? {
            Ticket::Ready(token) => Ok(token),
            Ticket::Wait(rx) => match rx.await {
                Ok(outcome) => outcome.map(Some),
                Err(_) => Err(CarinError::renewal_failed_transient(
                    "renewal ended without a result",
                )),
            },
            Ticket::Initiate(refresh_token) => {
                let guard = SettleGuard {
                    coordinator: self,
                    refresh_token: &refresh_token,
                    armed: true,
                };
                let outcome = self.renew(&refresh_token).await;
                guard.settle(&outcome);
                outcome.map(Some)
            }
        }
    }

    /// Renew now if the stored token is inside the refresh window
    pub async fn ensure_fresh(&self) -> Result<()> {
        self.access_token().await.map(|_| ())
    }

    async fn renew(&self, refresh_token: &str) -> RenewalOutcome {
        match tokio::time::timeout(self.renewal_timeout, self.exchange(refresh_token)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(CarinError::renewal_failed_transient(format!(
                "refresh exchange timed out after {:?}",
                self.renewal_timeout
            ))),
        }
    }

    async fn exchange(&self, refresh_token: &str) -> RenewalOutcome {
        let request = ApiRequest::post(REFRESH_ENDPOINT)
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.to_string(),
            })
            .map_err(|e| CarinError::renewal_failed(format!("could not encode request: {}", e)))?;

        let response = self.transport.send(request).await.map_err(|e| {
            CarinError::renewal_failed_transient(format!("refresh request failed: {}", e.message()))
        })?;

        if !response.is_success() {
            let message = format!(
                "refresh token rejected ({}): {}",
                response.status,
                response.error_message()
            );
            return Err(if response.status >= 500 {
                CarinError::renewal_failed_transient(message)
            } else {
                CarinError::renewal_failed(message)
            });
        }

        let payload: RefreshTokenResponse = response.into_json().map_err(|e| {
            CarinError::renewal_failed(format!("malformed refresh response: {}", e.message()))
        })?;

        token::decode_claims(&payload.token).map_err(|e| {
            CarinError::renewal_failed(format!("new access token is unreadable: {}", e.message()))
        })?;

        let next_refresh_token = payload
            .refresh_token
            .unwrap_or_else(|| refresh_token.to_string());
        let replaced = self
            .store
            .replace_if(
                refresh_token,
                StoredCredential::new(payload.token.clone(), next_refresh_token),
            )
            .map_err(|e| {
                CarinError::renewal_failed_transient(format!(
                    "could not persist renewed credential: {}",
                    e.message()
                ))
            })?;

        if replaced {
            info!("access token renewed");
            return Ok(payload.token);
        }

        // A login or logout landed while the exchange was in flight
        match self.store.get() {
            Some(current) => {
                debug!("session replaced during renewal, using the newer token");
                Ok(current.access_token)
            }
            None => Err(CarinError::not_authenticated()),
        }
    }
}
