//! HTTP auth client
//!
//! [`AuthApi`] over the dashboard backend's REST endpoints. Every request
//! first passes the outbound rate limiter, keyed by endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::ports::{AuthApi, LoginResponse};
use crate::domain::{AuthError, ClientError, ClientResult, NetworkError, UpdateUserDto, User};
use crate::shared::rate_limit::RateLimiter;
use crate::shared::validations::{ChangePasswordForm, LoginForm};

use super::dto::{error_message, LogoutRequest, ProfileEnvelope};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endpoint {
    Login,
    Logout,
    GetProfile,
    UpdateProfile,
    ChangePassword,
}

impl Endpoint {
    fn path(&self) -> &'static str {
        match self {
            Endpoint::Login => "/api/login",
            Endpoint::Logout => "/api/logout",
            Endpoint::GetProfile | Endpoint::UpdateProfile => "/api/profile",
            Endpoint::ChangePassword => "/api/change-password",
        }
    }

    /// Rate limiter key.
    fn key(&self) -> &'static str {
        match self {
            Endpoint::Login => "login",
            Endpoint::Logout => "logout",
            Endpoint::GetProfile => "get_profile",
            Endpoint::UpdateProfile => "update_profile",
            Endpoint::ChangePassword => "change_password",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
    limiter: RateLimiter,
}

impl HttpAuthApi {
    pub fn new(base_url: &str, timeout: Duration, limiter: RateLimiter) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    async fn send(&self, endpoint: Endpoint, request: RequestBuilder) -> ClientResult<Response> {
        self.limiter.check(endpoint.key())?;

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        debug!(endpoint = endpoint.key(), status = status.as_u16(), "HTTP response received");

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        Err(classify(endpoint, status, &body, retry_after))
    }

    async fn json<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::InvalidResponse(e.to_string()).into())
    }
}

fn transport_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        NetworkError::Timeout.into()
    } else {
        NetworkError::Unreachable(e.to_string()).into()
    }
}

/// Map a non-success status to the client taxonomy.
pub(crate) fn classify(
    endpoint: Endpoint,
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> ClientError {
    let message = error_message(body);
    match status.as_u16() {
        401 if endpoint == Endpoint::Login => AuthError::InvalidCredentials.into(),
        401 => AuthError::Unauthorized(message.unwrap_or_else(|| "unauthorized".into())).into(),
        403 => AuthError::Forbidden(message.unwrap_or_else(|| "forbidden".into())).into(),
        429 => ClientError::RateLimited {
            retry_after: retry_after.unwrap_or(Duration::from_secs(1)),
        },
        400 | 422 => ClientError::Validation(message.unwrap_or_else(|| "invalid request".into())),
        status => NetworkError::Server { status }.into(),
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, form: &LoginForm) -> ClientResult<LoginResponse> {
        let request = self.client.post(self.url(Endpoint::Login)).json(form);
        let response = self.send(Endpoint::Login, request).await?;
        Self::json(response).await
    }

    async fn logout(&self, access_token: &str, refresh_token: &str) -> ClientResult<()> {
        let request = self
            .client
            .post(self.url(Endpoint::Logout))
            .bearer_auth(access_token)
            .json(&LogoutRequest {
                refresh: refresh_token,
            });
        self.send(Endpoint::Logout, request).await?;
        Ok(())
    }

    async fn get_profile(&self, access_token: &str) -> ClientResult<User> {
        let request = self
            .client
            .get(self.url(Endpoint::GetProfile))
            .bearer_auth(access_token);
        let response = self.send(Endpoint::GetProfile, request).await?;
        Ok(Self::json::<ProfileEnvelope>(response).await?.into_user())
    }

    async fn update_profile(&self, access_token: &str, update: &UpdateUserDto) -> ClientResult<User> {
        let request = self
            .client
            .put(self.url(Endpoint::UpdateProfile))
            .bearer_auth(access_token)
            .json(update);
        let response = self.send(Endpoint::UpdateProfile, request).await?;
        Ok(Self::json::<ProfileEnvelope>(response).await?.into_user())
    }

    async fn change_password(&self, access_token: &str, form: &ChangePasswordForm) -> ClientResult<()> {
        let request = self
            .client
            .post(self.url(Endpoint::ChangePassword))
            .bearer_auth(access_token)
            .json(form);
        self.send(Endpoint::ChangePassword, request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(code: u16) -> StatusCode {
        StatusCode::from_u16(code).unwrap()
    }

    #[test]
    fn status_mapping() {
        let e = Endpoint::GetProfile;
        assert!(matches!(
            classify(e, status(401), "", None),
            ClientError::Auth(AuthError::Unauthorized(_))
        ));
        assert_eq!(
            classify(e, status(403), r#"{"message": "admins only"}"#, None),
            ClientError::Auth(AuthError::Forbidden("admins only".into()))
        );
        assert_eq!(
            classify(e, status(422), r#"{"detail": "phone: invalid"}"#, None),
            ClientError::Validation("phone: invalid".into())
        );
        assert_eq!(
            classify(e, status(503), "", None),
            ClientError::Network(NetworkError::Server { status: 503 })
        );
    }

    #[test]
    fn login_401_means_bad_credentials() {
        assert_eq!(
            classify(Endpoint::Login, status(401), "", None),
            ClientError::Auth(AuthError::InvalidCredentials)
        );
    }

    #[test]
    fn server_429_carries_retry_after() {
        assert_eq!(
            classify(Endpoint::Login, status(429), "", Some(Duration::from_secs(7))),
            ClientError::RateLimited {
                retry_after: Duration::from_secs(7)
            }
        );
    }

    #[tokio::test]
    async fn outbound_limiter_short_circuits() {
        let limiter = RateLimiter::new("api", 0, Duration::from_secs(60));
        let api = HttpAuthApi::new("http://127.0.0.1:9/", Duration::from_secs(1), limiter).unwrap();
        assert_eq!(api.base_url(), "http://127.0.0.1:9");
        let err = api.get_profile("t").await.unwrap_err();
        assert!(matches!(err, ClientError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        let limiter = RateLimiter::new("api", 10, Duration::from_secs(60));
        let api = HttpAuthApi::new("http://127.0.0.1:9", Duration::from_secs(2), limiter).unwrap();
        let err = api.logout("a", "r").await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "{:?}", err);
    }
}
