//! Auth boundary

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{AuthTokens, ClientResult, UpdateUserDto, User};
use crate::shared::validations::{ChangePasswordForm, LoginForm};

/// Successful login payload: `{access, refresh, user}`.
#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: String,
    pub user: User,
}

impl LoginResponse {
    pub fn tokens(&self) -> AuthTokens {
        AuthTokens {
            access: self.access.clone(),
            refresh: self.refresh.clone(),
        }
    }
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access", &"***")
            .field("refresh", &"***")
            .field("user", &self.user)
            .finish()
    }
}

/// Remote authentication and profile endpoints.
///
/// Forms arrive already validated. Implementations classify failures into
/// [`ClientError`](crate::domain::ClientError).
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, form: &LoginForm) -> ClientResult<LoginResponse>;

    /// Invalidate the credential server-side.
    async fn logout(&self, access_token: &str, refresh_token: &str) -> ClientResult<()>;

    async fn get_profile(&self, access_token: &str) -> ClientResult<User>;

    async fn update_profile(&self, access_token: &str, update: &UpdateUserDto) -> ClientResult<User>;

    async fn change_password(&self, access_token: &str, form: &ChangePasswordForm) -> ClientResult<()>;
}
