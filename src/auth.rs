//! Login, signup, verify and logout over the gateway and session store.

use crate::error::{ClientError, Result};
use crate::gateway::Gateway;
use crate::models::{AuthResponse, User};
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct Auth {
    gateway: Gateway,
}

impl Auth {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.gateway.session()
    }

    fn persist(&self, response: AuthResponse) -> Result<User> {
        self.session().save(&response.token, &response.user)?;
        Ok(response.user)
    }

    /// Sign in and store the returned token and user.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let response = self.gateway.login(username, password).await?;
        let user = self.persist(response)?;
        tracing::info!(user_id = user.id, "logged in");
        Ok(user)
    }

    /// Register a new account. A 4xx rejection of the submitted fields
    /// (duplicate username, bad email) comes back as `Validation`.
    #[tracing::instrument(skip(self, email, password))]
    pub async fn signup(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let response = self
            .gateway
            .create_account(username, email, password)
            .await
            .map_err(|e| match e {
                ClientError::Api { status, message } if (400..500).contains(&status) => {
                    ClientError::Validation(message)
                }
                other => other,
            })?;
        let user = self.persist(response)?;
        tracing::info!(user_id = user.id, "account created");
        Ok(user)
    }

    /// Re-validate the stored token. The server may rotate it; whatever
    /// it returns replaces the local token and cached user.
    pub async fn verify(&self) -> Result<User> {
        let response = self.gateway.verify().await?;
        self.persist(response)
    }

    /// Re-fetch the signed-in user and refresh the cached copy.
    pub async fn refresh_user(&self) -> Result<User> {
        let cached = self
            .session()
            .user()
            .ok_or(ClientError::AuthenticationRequired)?;
        let user = self.gateway.fetch_user(cached.id).await?;
        self.session().save_user(&user)?;
        Ok(user)
    }

    /// Tell the server (best effort), then always clear the local session.
    pub async fn logout(&self) -> Result<()> {
        if self.session().token().is_some() {
            if let Err(e) = self.gateway.logout().await {
                tracing::warn!(error = %e, "server logout failed, clearing local session anyway");
            }
        }
        self.session().clear()?;
        tracing::info!("logged out");
        Ok(())
    }
}
