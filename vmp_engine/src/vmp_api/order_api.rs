//! Checkout: turning a customer's basket into a gateway payment order and a stored, unverified ledger order.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{AccountType, Cents, Item, ItemKind, NewOrder, NewOrderEntry, Order, OrderCode},
    gateway::{PaymentGateway, PaymentOrderRequest},
    traits::{LedgerError, LedgerManagement, OrderManagement, VendorManagement},
    vmp_api::{
        errors::{OrderApiError, ValidationError},
        order_objects::{CheckoutRequest, CheckoutResult},
    },
};

pub struct OrderApi<B, G> {
    db: B,
    gateway: G,
}

impl<B, G> Debug for OrderApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderApi")
    }
}

/// A checkout line after its item has been looked up.
struct ResolvedEntry {
    item: Item,
    quantity: i64,
    license_item: Option<Item>,
}

impl<B, G> OrderApi<B, G>
where
    B: LedgerManagement + VendorManagement + OrderManagement,
    G: PaymentGateway,
{
    pub fn new(db: B, gateway: G) -> Self {
        Self { db, gateway }
    }

    /// Validates the basket, asks the gateway for an order code and stores the order.
    ///
    /// Every item that carries a license is expanded into two entries: a license fee paid by the vendor to the
    /// Organization, followed by the sale itself. Only sales count towards what the customer pays.
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutResult, OrderApiError> {
        request.validate_shape()?;
        let license_id = request.vendor_license_id.as_str();
        let vendor = self
            .db
            .fetch_vendor_by_license_id(license_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownVendor(license_id.to_string()))?;
        if vendor.is_disabled {
            return Err(ValidationError::DisabledVendor(license_id.to_string()).into());
        }
        let resolved = self.resolve_entries(&request).await?;
        if resolved.iter().any(|e| e.license_item.is_some()) && !request.has_customer_email() {
            return Err(ValidationError::MissingCustomerEmail.into());
        }

        let customer = match request.user_id.as_deref() {
            Some(user_id) => self.db.fetch_or_create_account_for_user(user_id).await?,
            None => self.db.fetch_account_by_type(AccountType::AnonymousUser).await?,
        };
        let vendor_account =
            self.db.fetch_account_for_vendor(vendor.id).await?.ok_or(LedgerError::VendorAccountNotFound(vendor.id))?;
        let organization = self.db.fetch_account_by_type(AccountType::Organization).await?;

        let mut entries = Vec::with_capacity(resolved.len() * 2);
        for entry in &resolved {
            if let Some(license) = &entry.license_item {
                entries.push(NewOrderEntry::new(license.id, entry.quantity, vendor_account.id, organization.id));
            }
            entries.push(NewOrderEntry::new(entry.item.id, entry.quantity, customer.id, vendor_account.id));
        }
        let total = order_total(&resolved)?;

        let payment_request = PaymentOrderRequest {
            amount: total,
            item_names: resolved.iter().map(|e| e.item.name.clone()).collect(),
            vendor_license_id: vendor.license_id.clone(),
            customer_email: request.customer_email.clone(),
        };
        let order_code = self.gateway.create_payment_order(payment_request).await?;

        let mut order = NewOrder::new(order_code, vendor.id);
        order.entries = entries;
        if let Some(email) = &request.customer_email {
            order = order.with_customer_email(email.as_str());
        }
        if let Some(user_id) = &request.user_id {
            order = order.with_user_id(user_id.as_str());
        }
        let order_id = self.db.create_order(order).await?;
        let order = self
            .db
            .fetch_order_by_id(order_id)
            .await?
            .ok_or_else(|| LedgerError::OrderNotFound(order_id.to_string()))?;
        let stored = order.total();
        if stored != total {
            error!(
                "🛒️ Order {order_code} for {license_id} was sent to the gateway over {total}, but its stored \
                 prices add up to {stored}. A price changed during checkout. The order cannot be verified."
            );
            return Err(OrderApiError::TotalChanged { order_code, charged: total, stored });
        }
        info!("🛒️ Checkout for {license_id} created order {order_code} over {total}");
        Ok(CheckoutResult { order_code, total, order })
    }

    pub async fn order_by_code(&self, order_code: OrderCode) -> Result<Option<Order>, OrderApiError> {
        Ok(self.db.fetch_order_by_code(order_code).await?)
    }

    pub async fn unverified_orders(&self) -> Result<Vec<Order>, OrderApiError> {
        Ok(self.db.fetch_unverified_orders().await?)
    }

    async fn resolve_entries(&self, request: &CheckoutRequest) -> Result<Vec<ResolvedEntry>, OrderApiError> {
        let mut resolved = Vec::with_capacity(request.entries.len());
        for entry in &request.entries {
            let item = self.enabled_item(entry.item_id).await?;
            if item.kind != ItemKind::Product {
                return Err(ValidationError::NotForSale(item.id).into());
            }
            let license_item = match item.license_item {
                Some(id) => Some(self.enabled_item(id).await?),
                None => None,
            };
            resolved.push(ResolvedEntry { item, quantity: entry.quantity, license_item });
        }
        Ok(resolved)
    }

    async fn enabled_item(&self, item_id: i64) -> Result<Item, OrderApiError> {
        let item = self.db.fetch_item(item_id).await?.ok_or(ValidationError::UnknownItem(item_id))?;
        if item.disabled {
            return Err(ValidationError::DisabledItem(item_id).into());
        }
        Ok(item)
    }
}

/// What the customer pays. License fee amounts must fit as well.
fn order_total(resolved: &[ResolvedEntry]) -> Result<Cents, ValidationError> {
    let mut total = Cents::default();
    for entry in resolved {
        if let Some(license) = &entry.license_item {
            license.price.checked_mul(entry.quantity).ok_or(ValidationError::AmountTooLarge(license.id))?;
        }
        let too_large = ValidationError::AmountTooLarge(entry.item.id);
        let amount = entry.item.price.checked_mul(entry.quantity).ok_or(too_large.clone())?;
        total = total.checked_add(amount).ok_or(too_large)?;
    }
    Ok(total)
}
