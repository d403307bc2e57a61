use crate::app_config::Config;
use crate::retry::RetryPolicy;
use crate::ClientError;
use async_trait::async_trait;
use lineup_core::booking::{Booking, BookingFilter, BookingStatus};
use lineup_core::error::{ApiError, ApiErrorBody};
use lineup_core::idempotency::IdempotencyKey;
use lineup_core::payment::{CertificateKind, CertificateOrder, Payment, PaymentRequest};
use lineup_core::ports::{BookingsApi, CreatedBooking, PaymentsApi};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Shared HTTP plumbing for the school API: base URL, timeouts, retry with
/// key-preserving replays, and structured error decoding.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api.request_timeout_seconds))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::from_config(&config.retry),
        })
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        key: Option<&IdempotencyKey>,
    ) -> Result<T, ApiError> {
        self.retry
            .run(|attempt| self.send(Method::POST, path, Some(body), key, attempt))
            .await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.retry
            .run(|attempt| self.send::<(), T>(Method::GET, path, None, None, attempt))
            .await
    }

    async fn send<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        key: Option<&IdempotencyKey>,
        attempt: u32,
    ) -> Result<T, ApiError> {
        if attempt > 1 {
            tracing::debug!("Replaying {} {} (attempt {})", method, path, attempt);
        }
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(key) = key {
            request = request.header(IDEMPOTENCY_HEADER, key.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Transport(format!("malformed response body: {}", e)));
        }

        let status_code = status.as_u16();
        match response.json::<ApiErrorBody>().await {
            Ok(body) => Err(ApiError::Api {
                status: status_code,
                code: body.error.code,
                message: body.error.message,
            }),
            // Legacy/proxy responses without the structured body.
            Err(_) => Err(ApiError::Api {
                status: status_code,
                code: None,
                message: status.canonical_reason().unwrap_or("unknown error").to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateBookingResponse {
    booking: Booking,
    hold_ttl_seconds: Option<u64>,
}

#[derive(Debug, Serialize)]
struct PaymentBody<'a> {
    payment_methods: &'a PaymentRequest,
}

#[derive(Debug, Serialize)]
struct CertificateBody<'a> {
    certificate: &'a CertificateKind,
    payment_methods: &'a PaymentRequest,
}

fn status_param(status: BookingStatus) -> &'static str {
    match status {
        BookingStatus::Hold => "HOLD",
        BookingStatus::Confirmed => "CONFIRMED",
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Expired => "EXPIRED",
    }
}

pub struct RestBookingsApi {
    client: Arc<RestClient>,
}

impl RestBookingsApi {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BookingsApi for RestBookingsApi {
    async fn create_booking(
        &self,
        session_id: Uuid,
        key: &IdempotencyKey,
    ) -> Result<CreatedBooking, ApiError> {
        let response: CreateBookingResponse = self
            .client
            .post_json(
                &format!("/sessions/{}/book", session_id),
                &serde_json::json!({}),
                Some(key),
            )
            .await?;
        Ok(CreatedBooking {
            booking: response.booking,
            hold_ttl_seconds: response.hold_ttl_seconds,
        })
    }

    async fn list_my_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>, ApiError> {
        let path = match filter.status {
            Some(status) => format!("/bookings?status={}", status_param(status)),
            None => "/bookings".to_string(),
        };
        self.client.get_json(&path).await
    }
}

pub struct RestPaymentsApi {
    client: Arc<RestClient>,
}

impl RestPaymentsApi {
    pub fn new(client: Arc<RestClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PaymentsApi for RestPaymentsApi {
    async fn create_booking_payment(
        &self,
        booking_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError> {
        self.client
            .post_json(
                &format!("/bookings/{}/payment", booking_id),
                &PaymentBody {
                    payment_methods: request,
                },
                Some(key),
            )
            .await
    }

    async fn purchase_season_ticket(
        &self,
        plan_id: Uuid,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<Payment, ApiError> {
        self.client
            .post_json(
                &format!("/season-ticket-plans/{}/purchase", plan_id),
                &PaymentBody {
                    payment_methods: request,
                },
                Some(key),
            )
            .await
    }

    async fn purchase_certificate(
        &self,
        kind: &CertificateKind,
        request: &PaymentRequest,
        key: &IdempotencyKey,
    ) -> Result<CertificateOrder, ApiError> {
        self.client
            .post_json(
                "/certificates",
                &CertificateBody {
                    certificate: kind,
                    payment_methods: request,
                },
                Some(key),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::payment::PaymentMethodRequest;
    use lineup_shared::money::Money;

    #[test]
    fn test_payment_body_wire_shape() {
        let request = PaymentRequest::Composite(vec![
            PaymentMethodRequest::LoyaltyBalance {
                amount: Money::new(50_000, "RUB"),
            },
            PaymentMethodRequest::Card,
        ]);
        let body = PaymentBody {
            payment_methods: &request,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json["payment_methods"].is_array());
        assert_eq!(json["payment_methods"][0]["method"], "LOYALTY_BALANCE");
        assert_eq!(json["payment_methods"][1]["method"], "CARD");
    }

    #[test]
    fn test_create_booking_response_parses_ttl_hint() {
        let json = r#"{
            "booking": {
                "id": "7f1e4cbb-9a04-4df6-8a68-0a8c95b843a2",
                "session_id": "2d1a2e8e-65cf-4f0a-9a7e-6a5d4f6e2b11",
                "status": "HOLD",
                "hold_expires_at": null,
                "price": {"amount_minor": 790000, "currency": "RUB"}
            },
            "hold_ttl_seconds": 900
        }"#;
        let response: CreateBookingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.hold_ttl_seconds, Some(900));
        assert_eq!(response.booking.status, BookingStatus::Hold);
        assert_eq!(response.booking.price.amount_minor, 790_000);
    }

    #[test]
    fn test_status_param_matches_wire_enum() {
        assert_eq!(status_param(BookingStatus::Hold), "HOLD");
        assert_eq!(status_param(BookingStatus::Expired), "EXPIRED");
    }
}
