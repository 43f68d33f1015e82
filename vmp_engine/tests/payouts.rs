mod support;

use std::{
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use chrono::{Duration, Utc};
use support::prepare_env::{balance_of, count_rows, ledger_sum, prepare_test_env, seed_catalog, singleton, Catalog};
use vmp_engine::{
    db_types::{AccountType, Cents, NewPayment},
    events::{EventHandlers, EventHooks, EventProducers, PayoutCreatedEvent},
    payment_objects::PaymentQueryFilter,
    LedgerError,
    LedgerManagement,
    PayoutApi,
    PayoutError,
    SettlementManagement,
    SqliteDatabase,
    VendorManagement,
};

/// A sale of 3.14 to the vendor, and a cent the vendor owes the organization.
async fn open_payments(db: &SqliteDatabase) -> Catalog {
    let catalog = seed_catalog(db).await;
    let customer = singleton(db, AccountType::AnonymousUser).await;
    let orga = singleton(db, AccountType::Organization).await;
    db.create_payment(NewPayment::new(customer.id, catalog.vendor_account.id, Cents::from(314))).await.unwrap();
    db.create_payment(NewPayment::new(catalog.vendor_account.id, orga.id, Cents::from(1))).await.unwrap();
    catalog
}

#[tokio::test]
async fn payout_settles_open_payments() {
    let db = prepare_test_env().await;
    let catalog = open_payments(&db).await;
    let published = Arc::new(Mutex::new(Vec::new()));
    let mut hooks = EventHooks::default();
    let seen = Arc::clone(&published);
    hooks.on_payout_created(move |ev: PayoutCreatedEvent| {
        let seen = Arc::clone(&seen);
        Box::pin(async move {
            seen.lock().unwrap().push((ev.vendor.license_id.clone(), ev.payout.amount));
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handlers = EventHandlers::new(2, hooks);
    let api = PayoutApi::new(db.clone(), handlers.producers());
    let tasks = handlers.start_handlers();

    let open = api.list_payments_for_payout(None, None, Some("VE-042")).await.unwrap();
    assert_eq!(open.len(), 2);
    let payout = api.create_payout("VE-042", "treasurer@example.org", None, None).await.unwrap();
    assert_eq!(payout.amount, Cents::from(313));
    assert_eq!(payout.sender, catalog.vendor_account.id);
    assert_eq!(payout.receiver, singleton(&db, AccountType::Cash).await.id);
    assert_eq!(payout.authorized_by, "treasurer@example.org");
    assert!(payout.payout_id.is_none());

    let settled = db.fetch_payments(PaymentQueryFilter::default().with_payout_id(payout.id)).await.unwrap();
    let mut settled_ids = settled.iter().map(|p| p.id).collect::<Vec<_>>();
    let mut open_ids = open.iter().map(|p| p.id).collect::<Vec<_>>();
    settled_ids.sort_unstable();
    open_ids.sort_unstable();
    assert_eq!(settled_ids, open_ids);

    assert_eq!(balance_of(&db, catalog.vendor_account.id).await, Cents::from(0));
    assert_eq!(db.reconcile_vendor_balance(catalog.vendor.id).await.unwrap(), Cents::from(0));
    assert_eq!(ledger_sum(&db).await, Cents::from(0));
    let vendor = db.fetch_vendor(catalog.vendor.id).await.unwrap().unwrap();
    assert!(vendor.last_payout.is_some());
    assert!(api.list_payments_for_payout(None, None, Some("VE-042")).await.unwrap().is_empty());
    assert!(api.list_payments_for_payout(None, None, None).await.unwrap().is_empty());

    drop(api);
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(published.lock().unwrap().clone(), vec![("VE-042".to_string(), Cents::from(313))]);
}

#[tokio::test]
async fn vendors_owing_money_are_not_paid_out() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let orga = singleton(&db, AccountType::Organization).await;
    db.create_payment(NewPayment::new(catalog.vendor_account.id, orga.id, Cents::from(500))).await.unwrap();
    let api = PayoutApi::new(db.clone(), EventProducers::default());
    let err = api.create_payout("VE-042", "treasurer@example.org", None, None).await.unwrap_err();
    assert!(matches!(err, PayoutError::PayoutAmountError(net) if net == Cents::from(-500)));

    let err = api.create_payout("VE-042", "treasurer@example.org", None, None).await;
    assert!(err.is_err());
    assert_eq!(count_rows(&db, "payments").await, 1);
    assert_eq!(api.list_payments_for_payout(None, None, Some("VE-042")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_vendors_are_reported() {
    let db = prepare_test_env().await;
    seed_catalog(&db).await;
    let api = PayoutApi::new(db.clone(), EventProducers::default());
    let err = api.create_payout("VE-404", "treasurer@example.org", None, None).await.unwrap_err();
    assert!(matches!(err, PayoutError::VendorNotFound(id) if id == "VE-404"));
}

#[tokio::test]
async fn payments_cannot_be_paid_out_twice() {
    let db = prepare_test_env().await;
    let catalog = open_payments(&db).await;
    let api = PayoutApi::new(db.clone(), EventProducers::default());
    let open = api.list_payments_for_payout(None, None, Some("VE-042")).await.unwrap();
    let sources = open.iter().map(|p| p.id).collect::<Vec<_>>();
    let payout = api.create_payout("VE-042", "treasurer@example.org", None, None).await.unwrap();

    // A second payout racing the first one, working from the same stale list of open payments
    let vendor_account = catalog.vendor_account.id;
    let err = db
        .create_payment_payout(catalog.vendor.id, vendor_account, "treasurer@example.org", Cents::from(313), &sources)
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::PayoutConflict(2)));
    assert_eq!(count_rows(&db, "payments").await, 3);
    assert_eq!(balance_of(&db, vendor_account).await, Cents::from(0));
    for id in sources {
        let payment = db.fetch_payment(id).await.unwrap().unwrap();
        assert_eq!(payment.payout_id, Some(payout.id));
    }
}

#[tokio::test]
async fn payouts_respect_the_date_range() {
    let db = prepare_test_env().await;
    let catalog = open_payments(&db).await;
    let api = PayoutApi::new(db.clone(), EventProducers::default());
    let now = Utc::now();
    let later = now + Duration::hours(1);
    let earlier = now - Duration::hours(1);

    assert!(api.list_payments_for_payout(Some(later), None, Some("VE-042")).await.unwrap().is_empty());
    assert!(api.list_payments_for_payout(None, Some(earlier), None).await.unwrap().is_empty());
    assert_eq!(api.list_payments_for_payout(Some(earlier), Some(later), None).await.unwrap().len(), 2);

    let err = api.create_payout("VE-042", "treasurer@example.org", Some(later), None).await.unwrap_err();
    assert!(matches!(err, PayoutError::PayoutAmountError(net) if net == Cents::from(0)));
    let payout = api.create_payout("VE-042", "treasurer@example.org", Some(earlier), Some(later)).await.unwrap();
    assert_eq!(payout.amount, Cents::from(313));
    assert_eq!(balance_of(&db, catalog.vendor_account.id).await, Cents::from(0));
}
