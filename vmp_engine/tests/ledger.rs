mod support;

use support::{
    mocks::MockGateway,
    prepare_env::{balance_of, ledger_sum, prepare_test_env, seed_catalog, singleton, test_config},
};
use vmp_engine::{
    db_types::{AccountType, Cents, NewPayment, NewVendor},
    events::EventProducers,
    helpers::AccountTypeCache,
    order_objects::CheckoutRequest,
    AccountApi,
    LedgerError,
    LedgerManagement,
    OrderApi,
    SettlementManagement,
    SqliteDatabase,
    VendorManagement,
    VerificationApi,
};

#[tokio::test]
async fn singleton_accounts_are_bootstrapped() {
    let db = prepare_test_env().await;
    for account_type in [
        AccountType::Cash,
        AccountType::Organization,
        AccountType::AnonymousUser,
        AccountType::VivaWallet,
        AccountType::Paypal,
    ] {
        let account = singleton(&db, account_type).await;
        assert_eq!(account.account_type, account_type);
        assert_eq!(account.balance, Cents::from(0));
    }
    let err = db.fetch_account_by_type(AccountType::Vendor).await.unwrap_err();
    assert!(matches!(err, LedgerError::NotSingletonType(AccountType::Vendor)));
}

#[tokio::test]
async fn account_type_cache_is_shared_between_clones() {
    let db = prepare_test_env().await;
    let cache = AccountTypeCache::default();
    let db = db.with_account_type_cache(cache.clone());
    let clone = db.clone();
    assert!(cache.is_empty());
    let cash = singleton(&db, AccountType::Cash).await;
    assert_eq!(cache.get(AccountType::Cash), Some(cash.id));
    assert_eq!(clone.account_type_cache().get(AccountType::Cash), Some(cash.id));
    let again = singleton(&clone, AccountType::Cash).await;
    assert_eq!(again.id, cash.id);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn user_accounts_are_created_once() {
    let db = prepare_test_env().await;
    let first = db.fetch_or_create_account_for_user("user-3141").await.unwrap();
    assert_eq!(first.account_type, AccountType::UserAuth);
    assert_eq!(first.user_id.as_deref(), Some("user-3141"));
    let second = db.fetch_or_create_account_for_user("user-3141").await.unwrap();
    assert_eq!(first.id, second.id);
    let other = db.fetch_or_create_account_for_user("user-2718").await.unwrap();
    assert_ne!(first.id, other.id);
}

#[tokio::test]
async fn payments_are_zero_sum() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let orga = singleton(&db, AccountType::Organization).await;

    let sale = NewPayment::new(customer.id, catalog.vendor_account.id, Cents::from(314)).authorized_by("admin");
    let payment = db.create_payment(sale).await.unwrap();
    assert_eq!(payment.amount, Cents::from(314));
    assert_eq!(payment.authorized_by, "admin");
    assert!(payment.role.is_none());
    db.create_payment(NewPayment::new(catalog.vendor_account.id, orga.id, Cents::from(1))).await.unwrap();

    assert_eq!(balance_of(&db, customer.id).await, Cents::from(-314));
    assert_eq!(balance_of(&db, catalog.vendor_account.id).await, Cents::from(313));
    assert_eq!(balance_of(&db, orga.id).await, Cents::from(1));
    assert_eq!(ledger_sum(&db).await, Cents::from(0));
}

#[tokio::test]
async fn non_positive_payments_are_rejected() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    for amount in [0, -5] {
        let err = db
            .create_payment(NewPayment::new(customer.id, catalog.vendor_account.id, Cents::from(amount)))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NonPositiveAmount(_)));
    }
    assert_eq!(balance_of(&db, customer.id).await, Cents::from(0));
    let err = db.create_payment(NewPayment::new(customer.id, 9999, Cents::from(5))).await.unwrap_err();
    assert!(matches!(err, LedgerError::DatabaseError(_) | LedgerError::AccountNotFound(9999)));
    assert_eq!(balance_of(&db, customer.id).await, Cents::from(0));
}

async fn settle_orders(db: &SqliteDatabase, n: usize) {
    let catalog = seed_catalog(db).await;
    let gateway = MockGateway::new();
    let orders = OrderApi::new(db.clone(), gateway.clone());
    let verifier = VerificationApi::new(db.clone(), gateway.clone(), test_config(), EventProducers::default());
    for i in 0..n {
        let request = CheckoutRequest::new("VE-042")
            .with_customer_email("reader@example.org")
            .with_entry(catalog.newspaper.id, 1 + i as i64)
            .with_entry(catalog.digital_edition.id, 1);
        let checkout = orders.checkout(request).await.unwrap();
        let tx_id = format!("tx-{i}");
        gateway.capture(&tx_id, checkout.order_code, checkout.total);
        verifier.process_webhook(gateway.notice(&tx_id)).await.unwrap();
    }
}

#[tokio::test]
async fn reconciliation_matches_incremental_balance() {
    let db = prepare_test_env().await;
    settle_orders(&db, 3).await;
    let api = AccountApi::new(db.clone());
    let (vendor, account) = api.vendor_account("VE-042").await.unwrap();
    // Sales of 20 + 40 + 60 plus three digital editions at 20, minus three license fees of 5
    assert_eq!(account.balance, Cents::from(16500));
    let reconciled = db.reconcile_vendor_balance(vendor.id).await.unwrap();
    assert_eq!(reconciled, account.balance);
    assert_eq!(ledger_sum(&db).await, Cents::from(0));
}

#[tokio::test]
async fn reconciliation_corrects_drift() {
    let db = prepare_test_env().await;
    settle_orders(&db, 1).await;
    let api = AccountApi::new(db.clone());
    let (_, account) = api.vendor_account("VE-042").await.unwrap();
    sqlx::query("UPDATE accounts SET balance = 1 WHERE id = $1").bind(account.id).execute(db.pool()).await.unwrap();
    assert_eq!(balance_of(&db, account.id).await, Cents::from(1));
    let balance = api.reconcile_vendor("VE-042").await.unwrap();
    assert_eq!(balance, account.balance);
    assert_eq!(balance_of(&db, account.id).await, account.balance);
}

#[tokio::test]
async fn vendors_come_with_an_account() {
    let db = prepare_test_env().await;
    let vendor = db.create_vendor(NewVendor::new("VE-007").with_email("bond@example.org")).await.unwrap();
    let account = db.fetch_account_for_vendor(vendor.id).await.unwrap().unwrap();
    assert_eq!(account.account_type, AccountType::Vendor);
    assert_eq!(account.vendor_id, Some(vendor.id));
    assert!(vendor.last_payout.is_none());

    let dup = db.create_vendor(NewVendor::new("VE-007")).await;
    assert!(dup.is_err());

    db.delete_vendor(vendor.id).await.unwrap();
    assert!(db.fetch_vendor(vendor.id).await.unwrap().is_none());
    assert!(db.fetch_account(account.id).await.unwrap().is_none());
}

#[tokio::test]
async fn vendors_with_payments_cannot_be_deleted() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    db.create_payment(NewPayment::new(customer.id, catalog.vendor_account.id, Cents::from(100))).await.unwrap();
    assert!(db.delete_vendor(catalog.vendor.id).await.is_err());
    assert!(db.fetch_vendor(catalog.vendor.id).await.unwrap().is_some());
    assert!(db.fetch_account(catalog.vendor_account.id).await.unwrap().is_some());
}
