use std::sync::Arc;

use cueline_core::{ClientEvent, EventSender, Identity, Role};
use log::debug;
use parking_lot::RwLock;
use serde::Deserialize;

use crate::{ApiRequest, ClientResult, Credentials, Endpoint, Transport};

/// Caches the profile of the logged in user.
pub struct IdentityCache<T> {
    credentials: Arc<Credentials<T>>,
    identity: RwLock<Option<Identity>>,
    sender: EventSender,
}

#[derive(Debug, Deserialize)]
struct CoinsBody {
    coins: i64,
}

impl<T> IdentityCache<T>
where
    T: Transport,
{
    pub fn new(credentials: &Arc<Credentials<T>>, sender: EventSender) -> Self {
        Self {
            credentials: credentials.clone(),
            identity: RwLock::new(None),
            sender,
        }
    }

    /// Fetches the identity again, or clears it when there is no session.
    pub async fn refresh(&self) -> ClientResult<Option<Identity>> {
        if !self.credentials.is_authenticated() {
            self.replace(None);
            return Ok(None);
        }

        let result = self
            .credentials
            .execute(ApiRequest::get(Endpoint::Identity))
            .await
            .and_then(|r| r.json::<Identity>());

        match result {
            Ok(identity) => {
                debug!(
                    "Identity is {} ({}, {} coins)",
                    identity.username, identity.role, identity.coin_balance
                );

                self.replace(Some(identity.clone()));
                Ok(Some(identity))
            }
            Err(error) => {
                self.replace(None);
                Err(error)
            }
        }
    }

    /// Returns the cached identity, as long as the session it was fetched with is still alive.
    pub fn current(&self) -> Option<Identity> {
        if !self.credentials.is_authenticated() {
            self.clear();
            return None;
        }

        self.identity.read().clone()
    }

    /// Returns the cached role. Anonymous users are plain users.
    pub fn role(&self) -> Role {
        self.current().map(|i| i.role).unwrap_or(Role::User)
    }

    /// Returns the cached coin balance
    pub fn coins(&self) -> Option<u64> {
        self.current().map(|i| i.coin_balance)
    }

    /// Fetches only the coin balance, updating the cached identity with it.
    pub async fn fetch_coins(&self) -> ClientResult<u64> {
        let body: CoinsBody = self
            .credentials
            .execute(ApiRequest::get(Endpoint::Coins))
            .await?
            .json()?;

        let coins = body.coins.max(0) as u64;

        let updated = {
            let mut identity = self.identity.write();

            match identity.as_mut() {
                Some(i) if i.coin_balance != coins => {
                    i.coin_balance = coins;
                    Some(i.clone())
                }
                _ => None,
            }
        };

        if let Some(identity) = updated {
            self.emit(Some(identity));
        }

        Ok(coins)
    }

    pub fn clear(&self) {
        self.replace(None);
    }

    fn replace(&self, identity: Option<Identity>) {
        let previous = std::mem::replace(&mut *self.identity.write(), identity.clone());

        if previous != identity {
            self.emit(identity);
        }
    }

    fn emit(&self, identity: Option<Identity>) {
        let _ = self.sender.send(ClientEvent::IdentityUpdated { identity });
    }
}
