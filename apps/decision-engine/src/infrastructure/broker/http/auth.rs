//! Client-credentials token issuer.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use super::api_types::{TokenRequestBody, TokenResponseBody};
use super::{error_from_response, transport_error};
use crate::application::ports::BrokerError;
use crate::infrastructure::broker::session::{SessionToken, TokenIssuer};

const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 3600;

/// Issues tokens from `POST /oauth2/token`.
#[derive(Debug, Clone)]
pub struct OAuthTokenIssuer {
    client: Client,
    base_url: String,
    app_key: String,
    app_secret: String,
    timeout: Duration,
}

impl OAuthTokenIssuer {
    /// Create an issuer.
    #[must_use]
    pub const fn new(
        client: Client,
        base_url: String,
        app_key: String,
        app_secret: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url,
            app_key,
            app_secret,
            timeout,
        }
    }
}

#[async_trait]
impl TokenIssuer for OAuthTokenIssuer {
    async fn issue(&self) -> Result<SessionToken, BrokerError> {
        let body = TokenRequestBody {
            grant_type: "client_credentials",
            app_key: &self.app_key,
            app_secret: &self.app_secret,
        };
        let response = self
            .client
            .post(format!("{}/oauth2/token", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(match error_from_response(response, "/oauth2/token").await {
                BrokerError::Http { status, message } if status == 400 => {
                    BrokerError::Authentication { message }
                }
                other => other,
            });
        }

        let token: TokenResponseBody = response.json().await.map_err(|e| BrokerError::Unknown {
            message: format!("malformed token response: {e}"),
        })?;
        Ok(SessionToken {
            access_token: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS)),
        })
    }
}
