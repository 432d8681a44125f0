//! Rate service client.
//!
//! The rate service takes a destination and an order total and answers with
//! the shipping methods available for it, as a JSON array.

use std::future::Future;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;
use url::Url;
use vinoteca_core::ShippingMethod;

use super::cache::QuoteFingerprint;
use crate::config::ShippingRatesConfig;

/// Errors that can occur when fetching shipping quotes.
#[derive(Debug, Error)]
pub enum QuoteError {
    /// The service reported a failure with a message meant for the customer.
    #[error("{0}")]
    Unavailable(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse response.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The fetch failed without saying why.
    #[error("Failed to load shipping methods")]
    Unspecified,
}

/// Body sent to the rate service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub country: String,
    pub postal_code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub order_total: Decimal,
}

impl From<&QuoteFingerprint> for QuoteRequest {
    fn from(fingerprint: &QuoteFingerprint) -> Self {
        Self {
            country: fingerprint.country.clone(),
            postal_code: fingerprint.postal_code.clone(),
            order_total: fingerprint.order_total,
        }
    }
}

/// Source of shipping quotes.
pub trait RateQuoter: Send + Sync + 'static {
    /// Fetch the methods available for a destination and order total.
    fn fetch_shipping_methods(
        &self,
        request: &QuoteRequest,
    ) -> impl Future<Output = Result<Vec<ShippingMethod>, QuoteError>> + Send;
}

/// Rate service client over HTTP.
#[derive(Clone)]
pub struct HttpRateQuoter {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRateQuoter {
    /// Create a new rate service client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ShippingRatesConfig) -> Result<Self, QuoteError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.token {
            let value = format!("Bearer {}", token.expose_secret());
            let mut value = HeaderValue::from_str(&value)
                .map_err(|e| QuoteError::Parse(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.url.clone(),
        })
    }
}

impl RateQuoter for HttpRateQuoter {
    #[instrument(skip(self), fields(country = %request.country, postal_code = %request.postal_code))]
    async fn fetch_shipping_methods(
        &self,
        request: &QuoteRequest,
    ) -> Result<Vec<ShippingMethod>, QuoteError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let status = response.status();

        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            let message = response.text().await.unwrap_or_default();
            let message = message.trim();
            return Err(if message.is_empty() {
                QuoteError::Unspecified
            } else {
                QuoteError::Unavailable(message.to_string())
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(QuoteError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let methods: Vec<ShippingMethod> = response
            .json()
            .await
            .map_err(|e| QuoteError::Parse(e.to_string()))?;

        tracing::debug!(count = methods.len(), "Received shipping quotes");
        Ok(methods)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use axum::{Json, Router, http::StatusCode, routing::post};
    use vinoteca_core::Address;

    use super::*;

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/rates")).unwrap()
    }

    fn config(url: Url) -> ShippingRatesConfig {
        ShippingRatesConfig {
            url,
            token: Some("rates-token".to_string().into()),
            timeout: Duration::from_secs(5),
        }
    }

    fn request() -> QuoteRequest {
        let address = Address {
            country: "es".to_string(),
            postal_code: "28013".to_string(),
            city: "Madrid".to_string(),
            ..Address::default()
        };
        QuoteRequest::from(&QuoteFingerprint::new(&address, Some(Decimal::new(4250, 2))))
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(request()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "country": "ES", "postalCode": "28013", "orderTotal": 42.5 })
        );
    }

    #[test]
    fn test_unspecified_message() {
        assert_eq!(
            QuoteError::Unspecified.to_string(),
            "Failed to load shipping methods"
        );
        assert_eq!(
            QuoteError::Unavailable("Network error".to_string()).to_string(),
            "Network error"
        );
    }

    #[tokio::test]
    async fn test_fetch_sends_request_and_token() {
        let router = Router::new().route(
            "/rates",
            post(
                |headers: axum::http::HeaderMap, Json(body): Json<serde_json::Value>| async move {
                    assert_eq!(headers[AUTHORIZATION], "Bearer rates-token");
                    assert_eq!(body["country"], "ES");
                    Json(serde_json::json!([
                        { "id": "express", "name": "Express", "description": "Next day", "price": 15.99, "estimatedDays": 1 }
                    ]))
                },
            ),
        );
        let quoter = HttpRateQuoter::new(&config(serve(router).await)).unwrap();

        let methods = quoter.fetch_shipping_methods(&request()).await.unwrap();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].id, "express");
        assert_eq!(methods[0].price, Decimal::new(1599, 2));
    }

    #[tokio::test]
    async fn test_service_unavailable_message() {
        let router = Router::new().route(
            "/rates",
            post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "Carrier offline") }),
        );
        let quoter = HttpRateQuoter::new(&config(serve(router).await)).unwrap();

        let err = quoter.fetch_shipping_methods(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Carrier offline");
    }

    #[tokio::test]
    async fn test_api_error_status() {
        let router = Router::new().route(
            "/rates",
            post(|| async { (StatusCode::BAD_REQUEST, "bad postal code") }),
        );
        let quoter = HttpRateQuoter::new(&config(serve(router).await)).unwrap();

        let err = quoter.fetch_shipping_methods(&request()).await.unwrap_err();
        assert!(matches!(err, QuoteError::Api { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_error() {
        let router = Router::new().route("/rates", post(|| async { "not json" }));
        let quoter = HttpRateQuoter::new(&config(serve(router).await)).unwrap();

        let err = quoter.fetch_shipping_methods(&request()).await.unwrap_err();
        assert!(matches!(err, QuoteError::Parse(_)));
    }
}
