use crate::{
    db_types::{Item, NewItem, NewVendor, Vendor},
    traits::LedgerError,
};

/// Storage for vendors and the catalogue of items they sell.
#[allow(async_fn_in_trait)]
pub trait VendorManagement {
    /// Creates the vendor and its `Vendor` account in one transaction.
    async fn create_vendor(&self, vendor: NewVendor) -> Result<Vendor, LedgerError>;

    async fn fetch_vendor(&self, vendor_id: i64) -> Result<Option<Vendor>, LedgerError>;

    async fn fetch_vendor_by_license_id(&self, license_id: &str) -> Result<Option<Vendor>, LedgerError>;

    /// Removes the vendor and its account. Fails if the account has been used in any payment or order.
    async fn delete_vendor(&self, vendor_id: i64) -> Result<(), LedgerError>;

    async fn create_item(&self, item: NewItem) -> Result<Item, LedgerError>;

    async fn fetch_item(&self, item_id: i64) -> Result<Option<Item>, LedgerError>;

    async fn fetch_item_by_name(&self, name: &str) -> Result<Option<Item>, LedgerError>;

    async fn set_item_disabled(&self, item_id: i64, disabled: bool) -> Result<Item, LedgerError>;
}
