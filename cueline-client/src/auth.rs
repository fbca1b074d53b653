use std::sync::Arc;

use crossbeam::atomic::AtomicCell;
use cueline_core::{ClientEvent, EventSender};
use log::{info, warn};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;

use crate::{
    token, ApiRequest, ApiResponse, ClientError, ClientResult, Endpoint, Session, SessionStore,
    Transport,
};

/// Owns the session, and attaches valid credentials to outgoing requests.
///
/// Expired access credentials are renewed transparently. Concurrent callers that observe the
/// same expired credential share a single renewal.
pub struct Credentials<T> {
    transport: Arc<T>,
    store: SessionStore,
    session: RwLock<Option<Session>>,
    /// Bumped whenever the session is replaced or ended. Only changed with `session` write-locked.
    generation: AtomicCell<u64>,
    /// Held for the duration of a renewal
    refresh_lock: tokio::sync::Mutex<()>,
    /// Seconds before expiry at which a credential counts as expired
    leeway: i64,
    sender: EventSender,
}

/// The credential pair returned by login and renewal
#[derive(Debug, Deserialize)]
struct TokenPair {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl<T> Credentials<T>
where
    T: Transport,
{
    pub fn new(transport: &Arc<T>, store: SessionStore, leeway: i64, sender: EventSender) -> Self {
        Self {
            transport: transport.clone(),
            store,
            session: RwLock::new(None),
            generation: AtomicCell::new(0),
            refresh_lock: tokio::sync::Mutex::new(()),
            leeway,
            sender,
        }
    }

    /// Loads a session persisted by a previous run. Returns true if there was one.
    pub fn restore(&self) -> ClientResult<bool> {
        let session = self.store.load()?;
        let restored = session.is_some();

        {
            let mut current = self.session.write();
            self.generation.fetch_add(1);
            *current = session;
        }

        if restored {
            info!("Restored session for {}", self.username().as_deref().unwrap_or("unknown user"));
        }

        Ok(restored)
    }

    /// Exchanges a username and password for a new session
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        let request = ApiRequest::post(Endpoint::Login).with_basic(username, password);

        let response = self.transport.send(request).await?;

        if response.status == 401 {
            return Err(ClientError::InvalidCredentials);
        }

        let pair: TokenPair = response.error_for_status()?.json()?;
        let session = Session::new(pair.token, pair.refresh_token.unwrap_or_default())
            .ok_or_else(|| ClientError::Malformed("Login returned an empty credential".into()))?;

        {
            let mut current = self.session.write();
            self.store.save(&session)?;
            self.generation.fetch_add(1);
            *current = Some(session);
        }

        info!("Logged in as {}", username);
        self.emit(ClientEvent::LoggedIn {
            username: username.to_string(),
        });

        Ok(())
    }

    /// Ends the session, locally and in storage. A renewal still in flight is discarded.
    pub fn logout(&self) -> ClientResult<()> {
        let had_session = {
            let mut current = self.session.write();
            self.generation.fetch_add(1);

            let had_session = current.take().is_some();
            self.store.clear()?;

            had_session
        };

        if had_session {
            info!("Logged out");
            self.emit(ClientEvent::LoggedOut);
        }

        Ok(())
    }

    /// Returns a copy of the current session
    pub fn session(&self) -> Option<Session> {
        self.session.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.read().is_some()
    }

    /// Returns the username claimed by the access credential
    pub fn username(&self) -> Option<String> {
        let session = self.session()?;
        token::decode_claims(session.access()).ok()?.username
    }

    /// Attaches a valid access credential to the request, renewing it first if needed.
    ///
    /// Public endpoints, and requests made without a session, pass through unchanged.
    pub async fn authorize(&self, request: ApiRequest) -> ClientResult<ApiRequest> {
        if request.endpoint.is_public() {
            return Ok(request);
        }

        let Some(session) = self.session() else {
            return Ok(request);
        };

        if !token::is_expired(session.access(), self.leeway) {
            return Ok(request.with_bearer(session.access()));
        }

        let renewed = self.renew().await?;
        Ok(request.with_bearer(renewed.access()))
    }

    /// Authorizes and sends a request, turning unsuccessful statuses into errors.
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let request = self.authorize(request).await?;
        let bearer = request.bearer().map(|b| b.to_string());

        let response = self.transport.send(request).await?;

        match response.error_for_status() {
            Err(ClientError::Unauthorized) => {
                if let Some(bearer) = bearer {
                    self.revoke(&bearer);
                }

                Err(ClientError::Unauthorized)
            }
            result => result,
        }
    }

    /// Renews the access credential, or reuses one renewed by a concurrent caller.
    async fn renew(&self) -> ClientResult<Session> {
        let _guard = self.refresh_lock.lock().await;

        let (session, generation) = {
            let session = self.session.read();
            (session.clone(), self.generation.load())
        };

        let current = match session {
            None => return Err(ClientError::AuthExpired),
            Some(s) if !token::is_expired(s.access(), self.leeway) => return Ok(s),
            Some(s) => s,
        };

        info!("Access credential expired, renewing");

        let request = ApiRequest::post(Endpoint::Refresh)
            .with_json(json!({ "refresh_token": current.refresh() }))
            .with_bearer(current.access());

        let renewed = match self.exchange(request, &current).await {
            Ok(renewed) => renewed,
            Err(error) => {
                warn!("Could not renew session: {}", error);
                self.destroy(generation);

                return Err(ClientError::AuthExpired);
            }
        };

        let persisted = {
            let mut session = self.session.write();

            if self.generation.load() != generation {
                info!("Session ended during renewal, discarding the renewed credential");
                return Err(ClientError::AuthExpired);
            }

            let persisted = self.store.save(&renewed);
            *session = Some(renewed.clone());

            persisted
        };

        if let Err(error) = persisted {
            warn!("Renewed credential could not be persisted: {}", error);
            return Err(error.into());
        }

        Ok(renewed)
    }

    async fn exchange(&self, request: ApiRequest, current: &Session) -> ClientResult<Session> {
        let pair: TokenPair = self
            .transport
            .send(request)
            .await?
            .error_for_status()?
            .json()?;

        current
            .renewed(pair.token, pair.refresh_token)
            .ok_or_else(|| ClientError::Malformed("Renewal returned an empty credential".into()))
    }

    /// Destroys the session if it still uses the rejected access credential.
    fn revoke(&self, rejected: &str) {
        let generation = {
            let session = self.session.read();

            session
                .as_ref()
                .is_some_and(|s| s.access() == rejected)
                .then(|| self.generation.load())
        };

        if let Some(generation) = generation {
            warn!("Access credential was rejected");
            self.destroy(generation);
        }
    }

    /// Ends the session, unless it was replaced or ended since `generation`.
    fn destroy(&self, generation: u64) {
        let had_session = {
            let mut session = self.session.write();

            if self.generation.load() != generation {
                return;
            }

            self.generation.fetch_add(1);

            if let Err(error) = self.store.clear() {
                warn!("Stored credentials could not be cleared: {}", error);
            }

            session.take().is_some()
        };

        if had_session {
            self.emit(ClientEvent::SessionExpired);
        }
    }

    fn emit(&self, event: ClientEvent) {
        // Nobody listening is fine
        let _ = self.sender.send(event);
    }
}
