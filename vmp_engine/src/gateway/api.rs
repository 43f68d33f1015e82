use std::sync::Arc;

use log::*;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::{
    config::GatewayConfig,
    db_types::OrderCode,
    gateway::{
        data_objects::{AccessTokenResponse, CustomerBody, PaymentOrderBody, PaymentOrderResponse},
        GatewayError,
        PaymentGateway,
        PaymentOrderRequest,
        TransactionRecord,
    },
};

/// HTTP client for the VivaWallet Smart Checkout API.
///
/// Every call authenticates first with the OAuth client-credentials flow and then sends the request with the
/// resulting bearer token.
#[derive(Clone)]
pub struct VivaWalletApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl VivaWalletApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client =
            Client::builder().timeout(config.timeout).build().map_err(|e| GatewayError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url.trim_end_matches('/'))
    }

    async fn access_token(&self) -> Result<String, GatewayError> {
        if self.config.client_id.is_empty() {
            return Err(GatewayError::MissingConfiguration("VMP_GATEWAY_CLIENT_ID"));
        }
        if self.config.client_key.reveal().is_empty() {
            return Err(GatewayError::MissingConfiguration("VMP_GATEWAY_CLIENT_KEY"));
        }
        let url = format!("{}/connect/token", self.config.accounts_url.trim_end_matches('/'));
        trace!("🌐️ Requesting access token from {url}");
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.client_id, Some(self.config.client_key.reveal()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| GatewayError::AuthenticationFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            return Err(GatewayError::AuthenticationFailed(format!("Token endpoint returned {status}")));
        }
        let token = response.json::<AccessTokenResponse>().await?;
        Ok(token.access_token)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, GatewayError> {
        let token = self.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        if response.status().is_success() {
            trace!("🌐️ Gateway query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await?;
            Err(GatewayError::QueryError { status, message })
        }
    }
}

impl PaymentGateway for VivaWalletApi {
    async fn create_payment_order(&self, request: PaymentOrderRequest) -> Result<OrderCode, GatewayError> {
        if self.config.source_code.is_empty() {
            return Err(GatewayError::MissingConfiguration("VMP_GATEWAY_SOURCE_CODE"));
        }
        let body = PaymentOrderBody {
            amount: request.amount.value(),
            customer_trns: request.customer_description(),
            customer: CustomerBody { email: request.customer_email.as_deref().unwrap_or_default() },
            payment_timeout: self.config.payment_timeout_secs,
            source_code: &self.config.source_code,
            merchant_trns: &self.config.merchant_trns,
            tags: &request.item_names,
        };
        let url = self.api_url("/checkout/v2/orders");
        debug!("🌐️ Creating payment order for {} ({})", request.amount, body.customer_trns);
        let response: PaymentOrderResponse = self.send(self.client.post(url).json(&body)).await?;
        info!("🌐️ Gateway assigned order code {} for {}", response.order_code, request.amount);
        Ok(response.order_code)
    }

    async fn fetch_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        let url = self.api_url(&format!("/checkout/v2/transactions/{transaction_id}"));
        trace!("🌐️ Fetching transaction {transaction_id}");
        match self.send::<TransactionRecord>(self.client.get(url)).await {
            Err(GatewayError::QueryError { status: 404, .. }) => {
                Err(GatewayError::TransactionNotFound(transaction_id.to_string()))
            },
            result => result,
        }
    }
}
