use cueline_core::{Action, Identity, Role};
use log::{info, warn};
use serde_json::json;

use crate::{ApiRequest, ClientContext, ClientError, ClientResult, Endpoint, Transport};

/// Account and coin management. User accounts have the same shape as an [Identity].
pub struct Admin<T> {
    context: ClientContext<T>,
}

impl<T> Admin<T>
where
    T: Transport,
{
    pub fn new(context: &ClientContext<T>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    pub async fn list_users(&self) -> ClientResult<Vec<Identity>> {
        self.context.ensure_allowed(Action::Administer)?;

        self.context
            .credentials
            .execute(ApiRequest::get(Endpoint::Users))
            .await?
            .json()
    }

    pub async fn add_user(&self, username: &str, password: &str, role: Role) -> ClientResult<()> {
        self.context.ensure_allowed(Action::Administer)?;
        validate("username", username)?;
        validate("password", password)?;

        let request = ApiRequest::post(Endpoint::Users).with_json(json!({
            "username": username,
            "password": password,
            "right": u8::from(role),
        }));

        self.context.credentials.execute(request).await?;
        info!("Added user {} as {}", username, role);

        Ok(())
    }

    /// Changes the password and role of an existing user
    pub async fn update_user(&self, username: &str, password: &str, role: Role) -> ClientResult<()> {
        self.context.ensure_allowed(Action::Administer)?;
        validate("username", username)?;
        validate("password", password)?;

        let request = ApiRequest::put(Endpoint::User(username.to_string())).with_json(json!({
            "username": username,
            "password": password,
            "right": u8::from(role),
        }));

        self.context.credentials.execute(request).await?;
        info!("Updated user {}", username);

        Ok(())
    }

    pub async fn delete_user(&self, username: &str) -> ClientResult<()> {
        self.context.ensure_allowed(Action::Administer)?;
        validate("username", username)?;

        self.context
            .credentials
            .execute(ApiRequest::delete(Endpoint::User(username.to_string())))
            .await?;

        info!("Deleted user {}", username);
        Ok(())
    }

    /// Sets the coin balance of a user
    pub async fn set_coins(&self, username: &str, coins: u64) -> ClientResult<()> {
        let request =
            ApiRequest::post(Endpoint::SetCoins(username.to_string())).with_json(json!({ "coins": coins }));

        self.change_coins(username, request).await
    }

    /// Adds to the coin balance of a user
    pub async fn add_coins(&self, username: &str, coins: u64) -> ClientResult<()> {
        let request =
            ApiRequest::post(Endpoint::AddCoins(username.to_string())).with_json(json!({ "coins": coins }));

        self.change_coins(username, request).await
    }

    /// Changes the password of the logged in user
    pub async fn change_password(&self, new_password: &str) -> ClientResult<()> {
        if !self.context.credentials.is_authenticated() {
            return Err(ClientError::AuthExpired);
        }

        validate("password", new_password)?;

        let request = ApiRequest::post(Endpoint::ChangePassword)
            .with_json(json!({ "newpassword": new_password }));

        self.context.credentials.execute(request).await?;
        info!("Changed password");

        Ok(())
    }

    async fn change_coins(&self, username: &str, request: ApiRequest) -> ClientResult<()> {
        self.context.ensure_allowed(Action::ManageCoins)?;
        validate("username", username)?;

        self.context.credentials.execute(request).await?;
        info!("Changed coins of {}", username);

        // The balance shown for the logged in user may have changed
        if let Err(error) = self.context.identity.refresh().await {
            warn!("Could not refresh identity: {}", error);
        }

        Ok(())
    }
}

fn validate(field: &str, value: &str) -> ClientResult<()> {
    if value.trim().is_empty() {
        return Err(ClientError::InvalidInput(format!("The {field} is empty")));
    }

    Ok(())
}
