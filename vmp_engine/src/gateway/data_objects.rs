//! Wire types of the card payment gateway.
//!
//! Webhook bodies use PascalCase keys and arrive wrapped in an envelope with the payload under `EventData`. The REST
//! API uses camelCase. Amounts are decimal major units on the wire and are converted to [`Cents`] on the way in.
use serde::{Deserialize, Deserializer, Serialize};
use vmp_common::{Cents, CentsConversionError};

use crate::db_types::OrderCode;

/// Statuses that mean the money has actually been captured.
pub const SUCCESS_STATUSES: [&str; 2] = ["F", "MW"];

pub fn is_success_status(status_id: &str) -> bool {
    SUCCESS_STATUSES.contains(&status_id)
}

/// The envelope every gateway webhook arrives in. Only the payload is of interest.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebhookEnvelope<T> {
    #[serde(default)]
    pub event_type_id: Option<i64>,
    pub event_data: T,
}

/// The "transaction payment created" webhook. This is a claim to be checked with the gateway, never a fact.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionNotice {
    #[serde(deserialize_with = "order_code_from_number_or_string")]
    pub order_code: OrderCode,
    pub transaction_id: String,
    pub amount: f64,
    pub status_id: String,
    #[serde(default)]
    pub transaction_type_id: i64,
}

/// The "transaction price calculated" webhook, reporting what the gateway charges for a transaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionPriceNotice {
    #[serde(deserialize_with = "order_code_from_number_or_string")]
    pub order_code: OrderCode,
    pub transaction_id: String,
    #[serde(default)]
    pub total_commission: f64,
}

impl TransactionPriceNotice {
    pub fn commission(&self) -> Result<Cents, CentsConversionError> {
        Cents::try_from_major(self.total_commission)
    }
}

/// The gateway's own record of a transaction, as returned by `GET /checkout/v2/transactions/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub order_code: OrderCode,
    pub amount: f64,
    pub status_id: String,
    #[serde(default)]
    pub transaction_type_id: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
}

impl TransactionRecord {
    pub fn amount_in_cents(&self) -> Result<Cents, CentsConversionError> {
        Cents::try_from_major(self.amount)
    }

    pub fn is_success(&self) -> bool {
        is_success_status(&self.status_id)
    }

    /// Builds the candidate notice a storefront poll would have received by webhook.
    pub fn as_notice(&self, transaction_id: &str) -> TransactionNotice {
        TransactionNotice {
            order_code: self.order_code,
            transaction_id: transaction_id.to_string(),
            amount: self.amount,
            status_id: self.status_id.clone(),
            transaction_type_id: self.transaction_type_id,
        }
    }
}

/// What we ask the gateway for when a customer checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOrderRequest {
    pub amount: Cents,
    pub item_names: Vec<String>,
    pub vendor_license_id: String,
    pub customer_email: Option<String>,
}

impl PaymentOrderRequest {
    /// The text shown to the customer on the payment page: item names followed by the vendor's license id.
    pub fn customer_description(&self) -> String {
        format!("{}, {}", self.item_names.join(", "), self.vendor_license_id)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentOrderBody<'a> {
    pub amount: i64,
    pub customer_trns: String,
    pub customer: CustomerBody<'a>,
    pub payment_timeout: u64,
    pub source_code: &'a str,
    pub merchant_trns: &'a str,
    pub tags: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CustomerBody<'a> {
    pub email: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PaymentOrderResponse {
    pub order_code: OrderCode,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccessTokenResponse {
    pub access_token: String,
}

/// Some webhooks send the order code as a number, others as a string.
fn order_code_from_number_or_string<'de, D>(deserializer: D) -> Result<OrderCode, D::Error>
where D: Deserializer<'de> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Number(i64),
        Text(String),
    }
    match Code::deserialize(deserializer)? {
        Code::Number(n) => Ok(OrderCode(n)),
        Code::Text(s) => s.trim().parse::<i64>().map(OrderCode).map_err(serde::de::Error::custom),
    }
}
