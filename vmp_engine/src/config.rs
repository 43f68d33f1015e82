//! Runtime settings, read from the environment.
//!
//! Every setting has a default. Missing values are logged at `info`, unparseable ones at `warn`, and the default is
//! used in both cases.
use std::{env, str::FromStr, time::Duration};

use log::*;
use vmp_common::{helpers::parse_boolean_flag, Secret};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/vmp_ledger.db";
const DEFAULT_TRANSACTION_COST_ITEM: &str = "transactionCost";
const DEFAULT_MERCHANT_TRNS: &str = "Ein gutes Leben für alle!";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub api_url: String,
    pub accounts_url: String,
    pub client_id: String,
    pub client_key: Secret<String>,
    pub source_code: String,
    pub merchant_trns: String,
    /// Bound on every HTTP call to the gateway
    pub timeout: Duration,
    /// How long the customer has to complete the payment, in seconds
    pub payment_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_url: "https://demo-api.vivapayments.com".to_string(),
            accounts_url: "https://demo-accounts.vivapayments.com".to_string(),
            client_id: String::default(),
            client_key: Secret::default(),
            source_code: String::default(),
            merchant_trns: DEFAULT_MERCHANT_TRNS.to_string(),
            timeout: Duration::from_secs(10),
            payment_timeout_secs: 300,
        }
    }
}

impl GatewayConfig {
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let api_url = string_var("VMP_GATEWAY_API_URL", defaults.api_url);
        let accounts_url = string_var("VMP_GATEWAY_ACCOUNTS_URL", defaults.accounts_url);
        let client_id = env::var("VMP_GATEWAY_CLIENT_ID").unwrap_or_else(|_| {
            warn!("🌐️ VMP_GATEWAY_CLIENT_ID is not set. Gateway calls will fail.");
            String::default()
        });
        let client_key = Secret::new(env::var("VMP_GATEWAY_CLIENT_KEY").unwrap_or_else(|_| {
            warn!("🌐️ VMP_GATEWAY_CLIENT_KEY is not set. Gateway calls will fail.");
            String::default()
        }));
        let source_code = string_var("VMP_GATEWAY_SOURCE_CODE", defaults.source_code);
        let merchant_trns = string_var("VMP_GATEWAY_MERCHANT_TRNS", defaults.merchant_trns);
        let timeout = Duration::from_secs(number_var("VMP_GATEWAY_TIMEOUT_SECS", 10u64));
        let payment_timeout_secs = number_var("VMP_GATEWAY_PAYMENT_TIMEOUT_SECS", defaults.payment_timeout_secs);
        Self {
            api_url,
            accounts_url,
            client_id,
            client_key,
            source_code,
            merchant_trns,
            timeout,
            payment_timeout_secs,
        }
    }
}

/// Settings for the ledger engine and the APIs built on top of it.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub database_url: String,
    pub max_connections: u32,
    /// How often the gateway is asked about a transaction before giving up
    pub verify_attempts: u32,
    pub verify_retry_delay: Duration,
    /// How often an order is looked up by code before giving up. Webhooks can overtake the checkout commit.
    pub order_lookup_attempts: u32,
    pub order_lookup_delay: Duration,
    /// When set, the Organization reimburses vendors for the gateway's transaction costs
    pub orga_covers_transaction_costs: bool,
    /// Name of the item used for transaction-cost entries. Priced at one cent, with the cost as its quantity.
    pub transaction_cost_item: String,
    /// Base URL for download links sent to customers
    pub frontend_url: String,
    pub event_buffer_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
            verify_attempts: 5,
            verify_retry_delay: Duration::from_millis(1000),
            order_lookup_attempts: 5,
            order_lookup_delay: Duration::from_millis(200),
            orga_covers_transaction_costs: false,
            transaction_cost_item: DEFAULT_TRANSACTION_COST_ITEM.to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            event_buffer_size: 25,
        }
    }
}

impl LedgerConfig {
    pub fn from_env_or_default() -> Self {
        let d = Self::default();
        Self {
            database_url: string_var("VMP_DATABASE_URL", d.database_url),
            max_connections: number_var("VMP_DATABASE_MAX_CONNECTIONS", d.max_connections),
            verify_attempts: number_var("VMP_VERIFY_ATTEMPTS", d.verify_attempts),
            verify_retry_delay: Duration::from_millis(number_var("VMP_VERIFY_RETRY_DELAY_MS", 1000u64)),
            order_lookup_attempts: number_var("VMP_ORDER_LOOKUP_ATTEMPTS", d.order_lookup_attempts),
            order_lookup_delay: Duration::from_millis(number_var("VMP_ORDER_LOOKUP_DELAY_MS", 200u64)),
            orga_covers_transaction_costs: parse_boolean_flag(
                env::var("VMP_ORGA_COVERS_TRANSACTION_COSTS").ok(),
                d.orga_covers_transaction_costs,
            ),
            transaction_cost_item: string_var("VMP_TRANSACTION_COST_ITEM", d.transaction_cost_item),
            frontend_url: string_var("VMP_FRONTEND_URL", d.frontend_url),
            event_buffer_size: number_var("VMP_EVENT_BUFFER_SIZE", d.event_buffer_size),
        }
    }
}

fn string_var(key: &str, default: String) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} is not set. Using {default}");
        default
    })
}

fn number_var<N>(key: &str, default: N) -> N
where N: FromStr + std::fmt::Display {
    match env::var(key) {
        Ok(s) => s.trim().parse::<N>().unwrap_or_else(|_| {
            warn!("{key} has an invalid value ({s}). Using {default}");
            default
        }),
        Err(_) => default,
    }
}
