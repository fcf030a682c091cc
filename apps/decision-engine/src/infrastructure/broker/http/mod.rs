//! Generic REST broker adapter.
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | submit | `POST /orders` |
//! | cancel | `DELETE /orders/{id}` |
//! | status | `GET /orders/{id}` |
//! | price | `GET /quotes/{code}` |
//! | balance | `GET /account/balance` |
//! | holdings | `GET /account/holdings` |
//! | token | `POST /oauth2/token` |
//!
//! Every call carries `Authorization: Bearer <token>` and `X-Account-Id`.
//! A 401 invalidates the rejected token (unless another call already
//! replaced it) and the call is repeated once with a fresh token.

mod api_types;
mod auth;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, StatusCode};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

pub use auth::OAuthTokenIssuer;

use self::api_types::{ErrorBody, OrderRequestBody, OrderResponseBody, QuoteBody};
use super::session::SessionManager;
use crate::application::ports::{
    AccountBalance, Broker, BrokerError, OrderAck, RequestContext, SubmitOrderRequest,
};
use crate::config::BrokerConfig;
use crate::domain::order_execution::OrderUpdate;
use crate::domain::portfolio::Holding;
use crate::domain::shared::{BrokerId, InstrumentCode};

/// REST broker client.
#[derive(Debug)]
pub struct HttpBroker {
    client: Client,
    base_url: String,
    account_id: String,
    idempotent: bool,
    request_timeout: Duration,
    sessions: SessionManager<OAuthTokenIssuer>,
}

impl HttpBroker {
    /// Create a client from broker settings.
    ///
    /// # Errors
    ///
    /// Returns `Authentication` when credentials are missing, or
    /// `ConnectionError` if the HTTP client cannot be built.
    pub fn new(config: &BrokerConfig) -> Result<Self, BrokerError> {
        if config.app_key.is_empty() || config.app_secret.is_empty() {
            return Err(BrokerError::Authentication {
                message: "app_key and app_secret are required".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BrokerError::ConnectionError {
                message: e.to_string(),
            })?;
        let base_url = config.base_url.trim_end_matches('/').to_string();
        let issuer = OAuthTokenIssuer::new(
            client.clone(),
            base_url.clone(),
            config.app_key.clone(),
            config.app_secret.clone(),
            config.request_timeout(),
        );

        Ok(Self {
            client,
            base_url,
            account_id: config.account_id.clone(),
            idempotent: config.idempotent_submission,
            request_timeout: config.request_timeout(),
            sessions: SessionManager::new(
                issuer,
                Duration::from_secs(config.token_refresh_margin_secs),
            ),
        })
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        ctx: &RequestContext,
    ) -> Result<Response, BrokerError> {
        let mut refreshed = false;
        loop {
            let token = self.sessions.get_valid_token(ctx).await?;
            let mut request = self
                .client
                .request(method.clone(), format!("{}{path}", self.base_url))
                .bearer_auth(&token)
                .header("X-Account-Id", &self.account_id);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| transport_error(e, self.request_timeout))?;
            let status = response.status();
            debug!(method = %method, path, status = status.as_u16(), "Broker response");

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                if self.sessions.invalidate(&token).await {
                    info!(path, "Broker rejected session token, refreshing");
                }
                refreshed = true;
                continue;
            }
            if !status.is_success() {
                return Err(error_from_response(response, path).await);
            }
            return Ok(response);
        }
    }

    async fn call<T: DeserializeOwned + Send>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
        ctx: &RequestContext,
    ) -> Result<T, BrokerError> {
        ctx.run(async {
            let response = self.send(method, path, body.as_ref(), ctx).await?;
            response.json::<T>().await.map_err(|e| BrokerError::Unknown {
                message: format!("malformed response from {path}: {e}"),
            })
        })
        .await
    }
}

#[async_trait]
impl Broker for HttpBroker {
    async fn submit_order(
        &self,
        request: &SubmitOrderRequest,
        ctx: &RequestContext,
    ) -> Result<OrderAck, BrokerError> {
        let body = serde_json::to_value(OrderRequestBody {
            account_id: &self.account_id,
            order: request,
        })
        .map_err(|e| BrokerError::Unknown {
            message: format!("could not encode order: {e}"),
        })?;

        info!(
            client_order_id = %request.client_order_id,
            code = %request.code,
            side = ?request.side,
            quantity = request.quantity,
            limit_price = ?request.limit_price,
            "Submitting order"
        );
        let response: OrderResponseBody = self.call(Method::POST, "/orders", Some(body), ctx).await?;
        Ok(response.into_ack())
    }

    async fn cancel_order(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<(), BrokerError> {
        let path = format!("/orders/{broker_order_id}");
        ctx.run(async {
            self.send(Method::DELETE, &path, None, ctx).await?;
            Ok(())
        })
        .await
    }

    async fn get_order_status(
        &self,
        broker_order_id: &BrokerId,
        ctx: &RequestContext,
    ) -> Result<OrderUpdate, BrokerError> {
        self.call(Method::GET, &format!("/orders/{broker_order_id}"), None, ctx)
            .await
    }

    async fn get_current_price(
        &self,
        code: &InstrumentCode,
        ctx: &RequestContext,
    ) -> Result<Decimal, BrokerError> {
        let quote: QuoteBody = self
            .call(Method::GET, &format!("/quotes/{code}"), None, ctx)
            .await?;
        if &quote.code != code {
            return Err(BrokerError::Unknown {
                message: format!("quote for {} returned for {code}", quote.code),
            });
        }
        Ok(quote.price)
    }

    async fn get_balance(&self, ctx: &RequestContext) -> Result<AccountBalance, BrokerError> {
        self.call(Method::GET, "/account/balance", None, ctx).await
    }

    async fn get_holdings(&self, ctx: &RequestContext) -> Result<Vec<Holding>, BrokerError> {
        self.call(Method::GET, "/account/holdings", None, ctx).await
    }

    fn supports_idempotent_submission(&self) -> bool {
        self.idempotent
    }
}

/// Map a transport failure; `timeout` is the client-level deadline.
pub(crate) fn transport_error(err: reqwest::Error, timeout: Duration) -> BrokerError {
    if err.is_timeout() {
        BrokerError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    } else {
        BrokerError::ConnectionError {
            message: err.to_string(),
        }
    }
}

/// Map a non-success response.
pub(crate) async fn error_from_response(response: Response, path: &str) -> BrokerError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) => (None, text),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BrokerError::Authentication { message },
        StatusCode::NOT_FOUND => BrokerError::OrderNotFound {
            order_id: path.rsplit('/').next().unwrap_or(path).to_string(),
        },
        StatusCode::TOO_MANY_REQUESTS => BrokerError::RateLimited,
        StatusCode::UNPROCESSABLE_ENTITY if code.as_deref() == Some("INSUFFICIENT_FUNDS") => {
            BrokerError::InsufficientFunds
        }
        StatusCode::UNPROCESSABLE_ENTITY => BrokerError::OrderRejected { reason: message },
        _ => BrokerError::Http {
            status: status.as_u16(),
            message,
        },
    }
}
