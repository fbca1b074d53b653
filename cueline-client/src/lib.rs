mod admin;
mod auth;
mod error;
mod identity;
mod session;
mod sync;
pub mod token;
mod transport;

use std::sync::Arc;

use crossbeam::{atomic::AtomicCell, channel::unbounded};
use log::{info, warn};
use serde::Deserialize;

pub use admin::*;
pub use auth::*;
pub use error::*;
pub use identity::*;
pub use session::*;
pub use sync::*;
pub use transport::*;

use cueline_core::{
    Action, CapabilitySet, ClientEvent, Config, EventReceiver, EventSender, Mode,
};

/// A client of a collaborative queue server, tying the session, identity, and queue together.
pub struct Client<T> {
    context: ClientContext<T>,
    receiver: EventReceiver,

    pub credentials: Arc<Credentials<T>>,
    pub identity: Arc<IdentityCache<T>>,
    pub queue: Arc<QueueSync<T>>,
    pub admin: Admin<T>,
}

/// A type passed to various components of the client, to access state and emit events.
pub struct ClientContext<T> {
    pub config: Arc<Config>,
    pub transport: Arc<T>,
    pub credentials: Arc<Credentials<T>>,
    pub identity: Arc<IdentityCache<T>>,

    mode: Arc<AtomicCell<Mode>>,
    sender: EventSender,
}

#[derive(Debug, Deserialize)]
struct ModeBody {
    mode: Mode,
}

impl<T> Client<T>
where
    T: Transport,
{
    /// Creates a client without any remote calls. The mode is [Mode::Simple] until set.
    pub fn new(config: Config, transport: T, store: SessionStore) -> Self {
        let (sender, receiver) = unbounded();
        let transport = Arc::new(transport);

        let credentials = Arc::new(Credentials::new(
            &transport,
            store,
            config.expiry_leeway_in_seconds(),
            sender.clone(),
        ));
        let identity = Arc::new(IdentityCache::new(&credentials, sender.clone()));

        let context = ClientContext {
            config: Arc::new(config),
            transport,
            credentials: credentials.clone(),
            identity: identity.clone(),
            mode: Arc::new(AtomicCell::new(Mode::Simple)),
            sender,
        };

        Self {
            queue: Arc::new(QueueSync::new(&context)),
            admin: Admin::new(&context),
            context,
            receiver,
            credentials,
            identity,
        }
    }

    /// Creates a client, restores the stored session, and fetches the mode and identity.
    pub async fn connect(config: Config, transport: T, store: SessionStore) -> ClientResult<Self> {
        let client = Self::new(config, transport, store);

        client.credentials.restore()?;

        let mode = client.fetch_mode().await?;
        client.context.mode.store(mode);
        info!("Server is in {} mode", mode);

        if let Err(error) = client.identity.refresh().await {
            warn!("Could not fetch identity: {}", error);
        }

        Ok(client)
    }

    /// Sets the mode, for clients created without connecting
    pub fn with_mode(self, mode: Mode) -> Self {
        self.context.mode.store(mode);
        self
    }

    pub fn mode(&self) -> Mode {
        self.context.mode.load()
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    pub fn transport(&self) -> &T {
        &self.context.transport
    }

    /// Returns what the current user may do in the current mode
    pub fn capabilities(&self) -> CapabilitySet {
        self.context.capabilities()
    }

    /// Logs in and fetches the identity of the new session.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<()> {
        self.credentials.login(username, password).await?;

        if let Err(error) = self.identity.refresh().await {
            warn!("Could not fetch identity: {}", error);
        }

        Ok(())
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.credentials.logout()?;
        self.identity.clear();

        Ok(())
    }

    /// Blocks until the next event
    pub fn wait_for_event(&self) -> Option<ClientEvent> {
        self.receiver.recv().ok()
    }

    /// Returns the next event, if one is pending
    pub fn try_event(&self) -> Option<ClientEvent> {
        self.receiver.try_recv().ok()
    }

    pub fn events(&self) -> EventReceiver {
        self.receiver.clone()
    }

    async fn fetch_mode(&self) -> ClientResult<Mode> {
        let body: ModeBody = self
            .credentials
            .execute(ApiRequest::get(Endpoint::Mode))
            .await?
            .json()?;

        Ok(body.mode)
    }
}

impl<T> ClientContext<T>
where
    T: Transport,
{
    pub fn mode(&self) -> Mode {
        self.mode.load()
    }

    /// Resolves capabilities for the cached role. Anonymous users are plain users.
    pub fn capabilities(&self) -> CapabilitySet {
        self.config
            .policy
            .capabilities(self.mode(), self.identity.role())
    }

    pub fn ensure_allowed(&self, action: Action) -> ClientResult<()> {
        if self.capabilities().allows(action) {
            Ok(())
        } else {
            Err(ClientError::NotPermitted(action))
        }
    }

    pub fn emit(&self, event: ClientEvent) {
        let _ = self.sender.send(event);
    }
}

impl<T> Clone for ClientContext<T>
where
    T: Transport,
{
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            transport: self.transport.clone(),
            credentials: self.credentials.clone(),
            identity: self.identity.clone(),
            mode: self.mode.clone(),
            sender: self.sender.clone(),
        }
    }
}

/// Builds a client in the given mode, logged in as `username` if given.
#[cfg(test)]
pub(crate) fn test_client(
    transport: transport::mock::MockTransport,
    mode: Mode,
    username: Option<&str>,
) -> Client<transport::mock::MockTransport> {
    test_client_with(Config::default(), transport, mode, username)
}

#[cfg(test)]
pub(crate) fn test_client_with(
    config: Config,
    transport: transport::mock::MockTransport,
    mode: Mode,
    username: Option<&str>,
) -> Client<transport::mock::MockTransport> {
    let store = SessionStore::default();

    if let Some(username) = username {
        let access = token::encode_for_test(chrono::Utc::now().timestamp() + 3600, username);
        let session = Session::new(access, "refresh").expect("session is valid");
        store.save(&session).expect("session is stored");
    }

    let client = Client::new(config, transport, store).with_mode(mode);
    client.credentials.restore().expect("session is restored");

    client
}

#[cfg(test)]
mod test {
    use cueline_core::Role;
    use serde_json::json;

    use super::*;
    use crate::transport::mock::{json, status, MockTransport};

    #[tokio::test]
    async fn test_connect_fetches_mode_and_identity() {
        let transport = MockTransport::new(|request| match request.endpoint {
            Endpoint::Mode => json(&json!({ "mode": 3 })),
            Endpoint::Identity => json(&json!({ "username": "mary", "right": 1, "coins": 7 })),
            _ => status(404, "not found"),
        });

        let store = SessionStore::default();
        let access = token::encode_for_test(chrono::Utc::now().timestamp() + 3600, "mary");
        store.save(&Session::new(access, "r").unwrap()).unwrap();

        let client = Client::connect(Config::default(), transport, store)
            .await
            .unwrap();

        assert_eq!(client.mode(), Mode::UserCoin);
        assert_eq!(client.identity.role(), Role::Moderator);
        assert!(client.capabilities().can_manage_coins);

        let mode_request = client
            .transport()
            .requests()
            .into_iter()
            .find(|r| r.endpoint == Endpoint::Mode)
            .unwrap();
        assert_eq!(mode_request.authorization, None);
    }

    #[tokio::test]
    async fn test_connect_fails_without_mode() {
        let transport = MockTransport::new(|_| status(503, "starting up"));

        let result = Client::connect(Config::default(), transport, SessionStore::default()).await;
        assert!(matches!(result, Err(ClientError::Transient(_))));
    }

    #[tokio::test]
    async fn test_logout_clears_identity() {
        let transport = MockTransport::new(|_| {
            json(&json!({ "username": "mary", "right": 2, "coins": 0 }))
        });

        let client = test_client(transport, Mode::UserVoting, Some("mary"));
        client.identity.refresh().await.unwrap();
        assert!(client.capabilities().can_admin);

        client.logout().unwrap();

        assert_eq!(client.identity.current(), None);
        assert!(!client.capabilities().can_admin);

        let events: Vec<_> = std::iter::from_fn(|| client.try_event()).collect();
        assert!(events.iter().any(|e| matches!(e, ClientEvent::LoggedOut)));
    }
}
