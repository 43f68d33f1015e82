use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;
pub use vmp_common::Cents;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------     AccountType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum AccountType {
    /// Where payouts end up. Money leaving the ledger.
    Cash,
    /// The marketplace operator. Collects license fees.
    Organization,
    /// Stands in for every customer that did not log in.
    AnonymousUser,
    /// One per authenticated customer.
    UserAuth,
    Vendor,
    VivaWallet,
    Paypal,
}

impl AccountType {
    /// Singleton account types have exactly one account, created when the schema is bootstrapped.
    pub fn is_singleton(&self) -> bool {
        !matches!(self, AccountType::Vendor | AccountType::UserAuth)
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountType::Cash => "Cash",
            AccountType::Organization => "Organization",
            AccountType::AnonymousUser => "AnonymousUser",
            AccountType::UserAuth => "UserAuth",
            AccountType::Vendor => "Vendor",
            AccountType::VivaWallet => "VivaWallet",
            AccountType::Paypal => "Paypal",
        };
        f.write_str(s)
    }
}

impl FromStr for AccountType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cash" => Ok(Self::Cash),
            "Organization" => Ok(Self::Organization),
            "AnonymousUser" => Ok(Self::AnonymousUser),
            "UserAuth" => Ok(Self::UserAuth),
            "Vendor" => Ok(Self::Vendor),
            "VivaWallet" => Ok(Self::VivaWallet),
            "Paypal" => Ok(Self::Paypal),
            s => Err(ConversionError(format!("Invalid account type: {s}"))),
        }
    }
}

//--------------------------------------       Account       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub account_type: AccountType,
    pub vendor_id: Option<i64>,
    pub user_id: Option<String>,
    pub balance: Cents,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------        Vendor       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Vendor {
    pub id: i64,
    pub license_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_disabled: bool,
    pub last_payout: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewVendor {
    pub license_id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl NewVendor {
    pub fn new<S: Into<String>>(license_id: S) -> Self {
        Self { license_id: license_id.into(), ..Default::default() }
    }

    pub fn with_email<S: Into<String>>(mut self, email: S) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_name<S: Into<String>>(mut self, first_name: S, last_name: S) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }
}

//--------------------------------------        Item         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ItemKind {
    /// Anything a customer buys from a vendor.
    Product,
    /// The fee a vendor owes the organization for every licensed product sold.
    License,
    /// Gateway commission passed through to the payment provider.
    TransactionCost,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub kind: ItemKind,
    pub disabled: bool,
    /// The license item whose fee is charged to the vendor when this item is sold
    pub license_item: Option<i64>,
    /// Identity-provider group granted to the customer after purchase
    pub license_group: Option<String>,
    /// PDF resource the customer may download after purchase
    pub pdf_id: Option<i64>,
}

impl Item {
    /// What the customer is entitled to after buying this item, if anything. PDF downloads take precedence over group
    /// membership.
    pub fn entitlement_kind(&self) -> Option<EntitlementKind> {
        self.license_item?;
        if self.pdf_id.is_some() {
            Some(EntitlementKind::PdfDownload)
        } else if self.license_group.is_some() {
            Some(EntitlementKind::LicenseGroup)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub price: Cents,
    pub kind: ItemKind,
    pub license_item: Option<i64>,
    pub license_group: Option<String>,
    pub pdf_id: Option<i64>,
}

impl NewItem {
    pub fn new<S: Into<String>>(name: S, price: Cents) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            price,
            kind: ItemKind::Product,
            license_item: None,
            license_group: None,
            pdf_id: None,
        }
    }

    pub fn with_kind(mut self, kind: ItemKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_license(mut self, license_item: i64) -> Self {
        self.license_item = Some(license_item);
        self
    }

    pub fn with_license_group<S: Into<String>>(mut self, group: S) -> Self {
        self.license_group = Some(group.into());
        self
    }

    pub fn with_pdf(mut self, pdf_id: i64) -> Self {
        self.pdf_id = Some(pdf_id);
        self
    }
}

//--------------------------------------      EntryRole      ---------------------------------------------------------
/// What an order entry (and the payment it settles into) represents in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntryRole {
    Sale,
    LicenseFee,
    TransactionCost,
}

impl From<ItemKind> for EntryRole {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Product => EntryRole::Sale,
            ItemKind::License => EntryRole::LicenseFee,
            ItemKind::TransactionCost => EntryRole::TransactionCost,
        }
    }
}

impl Display for EntryRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryRole::Sale => write!(f, "Sale"),
            EntryRole::LicenseFee => write!(f, "LicenseFee"),
            EntryRole::TransactionCost => write!(f, "TransactionCost"),
        }
    }
}

//--------------------------------------      OrderCode      ---------------------------------------------------------
/// The order code handed out by the payment gateway when the checkout was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderCode(pub i64);

impl From<i64> for OrderCode {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub order_code: OrderCode,
    pub transaction_id: Option<String>,
    pub verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub transaction_type_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub vendor_id: i64,
    pub customer_email: Option<String>,
    pub user_id: Option<String>,
    #[sqlx(skip)]
    pub entries: Vec<OrderEntry>,
}

impl Order {
    /// The amount the customer pays: sale entries only.
    pub fn total(&self) -> Cents {
        self.entries.iter().filter(|e| e.is_sale()).map(OrderEntry::amount).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct OrderEntry {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    /// Unit price at the time the order was placed
    pub price: Cents,
    pub sender: i64,
    pub receiver: i64,
    pub role: EntryRole,
}

impl OrderEntry {
    pub fn amount(&self) -> Cents {
        self.price * self.quantity
    }

    pub fn is_sale(&self) -> bool {
        self.role == EntryRole::Sale
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_code: OrderCode,
    pub vendor_id: i64,
    pub customer_email: Option<String>,
    pub user_id: Option<String>,
    pub entries: Vec<NewOrderEntry>,
}

impl NewOrder {
    pub fn new(order_code: OrderCode, vendor_id: i64) -> Self {
        Self { order_code, vendor_id, customer_email: None, user_id: None, entries: vec![] }
    }

    pub fn with_customer_email<S: Into<String>>(mut self, email: S) -> Self {
        self.customer_email = Some(email.into());
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_entry(mut self, entry: NewOrderEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// An order line as submitted by the caller. Price and role are taken from the item when the order is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewOrderEntry {
    pub item_id: i64,
    pub quantity: i64,
    pub sender: i64,
    pub receiver: i64,
}

impl NewOrderEntry {
    pub fn new(item_id: i64, quantity: i64, sender: i64, receiver: i64) -> Self {
        Self { item_id, quantity, sender, receiver }
    }
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Payment {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub sender: i64,
    pub receiver: i64,
    pub amount: Cents,
    /// Who authorized the payment. Empty for system-generated payments
    pub authorized_by: String,
    pub order_id: Option<i64>,
    pub order_entry_id: Option<i64>,
    /// The payout payment this payment has been settled by, if any
    pub payout_id: Option<i64>,
    pub role: Option<EntryRole>,
    pub item_id: Option<i64>,
    pub quantity: i64,
    pub price: Cents,
}

impl Payment {
    pub fn is_sale(&self) -> bool {
        self.role == Some(EntryRole::Sale)
    }

    /// The effect of this payment on the balance of `account_id`.
    pub fn delta_for(&self, account_id: i64) -> Cents {
        let mut delta = Cents::default();
        if self.receiver == account_id {
            delta += self.amount;
        }
        if self.sender == account_id {
            delta -= self.amount;
        }
        delta
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub sender: i64,
    pub receiver: i64,
    pub amount: Cents,
    pub authorized_by: String,
    pub order_id: Option<i64>,
    pub order_entry_id: Option<i64>,
    pub role: Option<EntryRole>,
    pub item_id: Option<i64>,
    pub quantity: i64,
    pub price: Cents,
}

impl NewPayment {
    pub fn new(sender: i64, receiver: i64, amount: Cents) -> Self {
        Self {
            sender,
            receiver,
            amount,
            authorized_by: String::new(),
            order_id: None,
            order_entry_id: None,
            role: None,
            item_id: None,
            quantity: 1,
            price: amount,
        }
    }

    /// The payment that settles a single order entry.
    pub fn for_entry(entry: &OrderEntry) -> Self {
        Self {
            sender: entry.sender,
            receiver: entry.receiver,
            amount: entry.amount(),
            authorized_by: String::new(),
            order_id: Some(entry.order_id),
            order_entry_id: Some(entry.id),
            role: Some(entry.role),
            item_id: Some(entry.item_id),
            quantity: entry.quantity,
            price: entry.price,
        }
    }

    pub fn authorized_by<S: Into<String>>(mut self, identity: S) -> Self {
        self.authorized_by = identity.into();
        self
    }
}

//--------------------------------------     Entitlement     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum EntitlementKind {
    PdfDownload,
    LicenseGroup,
}

/// A record of the non-monetary goods granted to a customer for one item of one order. At most one exists per
/// (order, item).
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Entitlement {
    pub id: i64,
    pub order_id: i64,
    pub item_id: i64,
    pub kind: EntitlementKind,
    pub pdf_id: Option<i64>,
    /// Random, unguessable identifier used in the download URL
    pub link_id: Option<String>,
    pub license_group: Option<String>,
    pub created_at: DateTime<Utc>,
}
