use thiserror::Error;

use crate::{
    db_types::{Cents, OrderCode},
    gateway::GatewayError,
    traits::LedgerError,
};

/// Problems with a checkout request, detected before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("An order needs at least one entry")]
    EmptyOrder,
    #[error("Quantity for item {item_id} must be positive. Got {quantity}")]
    NonPositiveQuantity { item_id: i64, quantity: i64 },
    #[error("Item {0} appears more than once in the order")]
    DuplicateItem(i64),
    #[error("Item {0} does not exist")]
    UnknownItem(i64),
    #[error("Item {0} is disabled")]
    DisabledItem(i64),
    #[error("Item {0} is not for sale")]
    NotForSale(i64),
    #[error("A customer email address is required when buying licensed items")]
    MissingCustomerEmail,
    #[error("Vendor {0} does not exist")]
    UnknownVendor(String),
    #[error("Vendor {0} is disabled")]
    DisabledVendor(String),
    #[error("The amount for item {0} is too large")]
    AmountTooLarge(i64),
}

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("Invalid order: {0}")]
    Validation(#[from] ValidationError),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Order {order_code} was charged {charged}, but its prices add up to {stored}")]
    TotalChanged { order_code: OrderCode, charged: Cents, stored: Cents },
}

/// Which part of a gateway notice disagreed with the gateway or the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayMismatch {
    #[error("order code: gateway says {expected}, notice says {actual}")]
    OrderCode { expected: OrderCode, actual: OrderCode },
    #[error("amount: gateway says {expected}, notice says {actual}")]
    Amount { expected: Cents, actual: Cents },
    #[error("status: gateway says {expected}, notice says {actual}")]
    Status { expected: String, actual: String },
    #[error("status {0} does not indicate a completed payment")]
    Unsuccessful(String),
    #[error("order total: ledger says {expected}, notice says {actual}")]
    Total { expected: Cents, actual: Cents },
}

#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    #[error("Gateway could not be reached after {attempts} attempts: {last_error}")]
    GatewayUnavailable { attempts: u32, last_error: GatewayError },
    #[error("Gateway mismatch on {0}")]
    GatewayMismatch(#[from] GatewayMismatch),
    #[error("Order {0} has already been verified")]
    AlreadyVerified(OrderCode),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderCode),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Transaction cost item {0} does not exist")]
    TransactionCostItemMissing(String),
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for VerificationError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::AlreadyVerified(code) => VerificationError::AlreadyVerified(code),
            e => VerificationError::Ledger(e),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum PayoutError {
    #[error("Vendor {0} does not exist")]
    VendorNotFound(String),
    #[error("Vendor {0} does not have an account")]
    VendorAccountNotFound(String),
    #[error("Nothing to pay out. The net amount is {0}")]
    PayoutAmountError(Cents),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Vendor {0} does not exist")]
    VendorNotFound(String),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}
