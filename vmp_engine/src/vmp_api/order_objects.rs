use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cents, Order, OrderCode},
    vmp_api::errors::ValidationError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutEntry {
    pub item_id: i64,
    pub quantity: i64,
}

impl CheckoutEntry {
    pub fn new(item_id: i64, quantity: i64) -> Self {
        Self { item_id, quantity }
    }
}

/// A customer's request to buy items from a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub vendor_license_id: String,
    #[serde(default)]
    pub customer_email: Option<String>,
    /// The external id of an authenticated customer. Anonymous purchases leave this empty.
    #[serde(default)]
    pub user_id: Option<String>,
    pub entries: Vec<CheckoutEntry>,
}

impl CheckoutRequest {
    pub fn new<S: Into<String>>(vendor_license_id: S) -> Self {
        Self { vendor_license_id: vendor_license_id.into(), customer_email: None, user_id: None, entries: Vec::new() }
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_entry(mut self, item_id: i64, quantity: i64) -> Self {
        self.entries.push(CheckoutEntry::new(item_id, quantity));
        self
    }

    /// The checks that need nothing but the request itself.
    pub fn validate_shape(&self) -> Result<(), ValidationError> {
        if self.entries.is_empty() {
            return Err(ValidationError::EmptyOrder);
        }
        let mut seen = HashSet::with_capacity(self.entries.len());
        for entry in &self.entries {
            if entry.quantity <= 0 {
                return Err(ValidationError::NonPositiveQuantity { item_id: entry.item_id, quantity: entry.quantity });
            }
            if !seen.insert(entry.item_id) {
                return Err(ValidationError::DuplicateItem(entry.item_id));
            }
        }
        Ok(())
    }

    pub fn has_customer_email(&self) -> bool {
        self.customer_email.as_deref().is_some_and(|e| !e.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    pub order_code: OrderCode,
    /// What the customer is asked to pay
    pub total: Cents,
    pub order: Order,
}
