mod support;

use support::{
    mocks::MockGateway,
    prepare_env::{count_rows, prepare_test_env, seed_catalog, singleton},
};
use vmp_engine::{
    db_types::{AccountType, Cents, EntryRole, NewOrder, NewOrderEntry, OrderCode},
    order_objects::CheckoutRequest,
    LedgerError,
    LedgerManagement,
    OrderApi,
    OrderApiError,
    OrderManagement,
    ValidationError,
    VendorManagement,
};

#[tokio::test]
async fn order_total_counts_sales_only() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let orga = singleton(&db, AccountType::Organization).await;
    let vendor = catalog.vendor_account.id;
    let order = NewOrder::new(OrderCode(1), catalog.vendor.id)
        .with_entry(NewOrderEntry::new(catalog.newspaper.id, 2, customer.id, vendor))
        .with_entry(NewOrderEntry::new(catalog.license.id, 1, vendor, orga.id));
    let id = db.create_order(order).await.unwrap();
    let order = db.fetch_order_by_id(id).await.unwrap().unwrap();
    assert_eq!(order.entries.len(), 2);
    assert_eq!(order.entries[0].role, EntryRole::Sale);
    assert_eq!(order.entries[1].role, EntryRole::LicenseFee);
    assert_eq!(order.total(), Cents::from(4000));
    assert!(!order.verified);
}

#[tokio::test]
async fn prices_are_snapshotted_when_the_order_is_stored() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let order = NewOrder::new(OrderCode(2), catalog.vendor.id).with_entry(NewOrderEntry::new(
        catalog.newspaper.id,
        1,
        customer.id,
        catalog.vendor_account.id,
    ));
    let id = db.create_order(order).await.unwrap();
    sqlx::query("UPDATE items SET price = 9999 WHERE id = $1")
        .bind(catalog.newspaper.id)
        .execute(db.pool())
        .await
        .unwrap();
    let order = db.fetch_order_by_code(OrderCode(2)).await.unwrap().unwrap();
    assert_eq!(order.id, id);
    assert_eq!(order.entries[0].price, Cents::from(2000));
    assert_eq!(order.total(), Cents::from(2000));
}

#[tokio::test]
async fn disabled_items_reject_the_whole_order() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let item = db.set_item_disabled(catalog.digital_edition.id, true).await.unwrap();
    assert!(item.disabled);
    let vendor = catalog.vendor_account.id;
    let order = NewOrder::new(OrderCode(3), catalog.vendor.id)
        .with_entry(NewOrderEntry::new(catalog.newspaper.id, 1, customer.id, vendor))
        .with_entry(NewOrderEntry::new(catalog.digital_edition.id, 1, customer.id, vendor));
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, LedgerError::ItemDisabled(id) if id == catalog.digital_edition.id));
    assert!(db.fetch_order_by_code(OrderCode(3)).await.unwrap().is_none());
    assert_eq!(count_rows(&db, "orders").await, 0);
    assert_eq!(count_rows(&db, "order_entries").await, 0);

    let order = NewOrder::new(OrderCode(4), catalog.vendor.id)
        .with_entry(NewOrderEntry::new(424242, 1, customer.id, vendor));
    assert!(matches!(db.create_order(order).await, Err(LedgerError::ItemNotFound(424242))));
}

#[tokio::test]
async fn order_codes_are_unique() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let entry = NewOrderEntry::new(catalog.newspaper.id, 1, customer.id, catalog.vendor_account.id);
    db.create_order(NewOrder::new(OrderCode(5), catalog.vendor.id).with_entry(entry)).await.unwrap();
    let err = db.create_order(NewOrder::new(OrderCode(5), catalog.vendor.id).with_entry(entry)).await.unwrap_err();
    assert!(matches!(err, LedgerError::OrderAlreadyExists(OrderCode(5))));
    assert_eq!(db.fetch_unverified_orders().await.unwrap().len(), 1);
}

#[tokio::test]
async fn checkout_expands_license_fees() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let gateway = MockGateway::new();
    let api = OrderApi::new(db.clone(), gateway.clone());
    let request = CheckoutRequest::new("VE-042")
        .with_customer_email("reader@example.org")
        .with_entry(catalog.newspaper.id, 1)
        .with_entry(catalog.digital_edition.id, 2);
    let result = api.checkout(request).await.unwrap();

    let anonymous = singleton(&db, AccountType::AnonymousUser).await;
    let orga = singleton(&db, AccountType::Organization).await;
    let vendor = catalog.vendor_account.id;
    let entries = &result.order.entries;
    assert_eq!(entries.len(), 3);
    assert_eq!((entries[0].item_id, entries[0].role), (catalog.newspaper.id, EntryRole::Sale));
    assert_eq!((entries[0].sender, entries[0].receiver), (anonymous.id, vendor));
    assert_eq!((entries[1].item_id, entries[1].role), (catalog.license.id, EntryRole::LicenseFee));
    assert_eq!((entries[1].sender, entries[1].receiver, entries[1].quantity), (vendor, orga.id, 2));
    assert_eq!((entries[2].item_id, entries[2].role), (catalog.digital_edition.id, EntryRole::Sale));
    assert_eq!(result.total, Cents::from(6000));
    assert_eq!(result.order.customer_email.as_deref(), Some("reader@example.org"));

    let requests = gateway.payment_orders();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, Cents::from(6000));
    assert_eq!(requests[0].customer_description(), "Newspaper, Digital edition, VE-042");
    assert_eq!(result.order_code, api.order_by_code(result.order_code).await.unwrap().unwrap().order_code);
}

#[tokio::test]
async fn authenticated_customers_pay_from_their_own_account() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let api = OrderApi::new(db.clone(), MockGateway::new());
    let request = CheckoutRequest::new("VE-042").with_user_id("user-1").with_entry(catalog.newspaper.id, 1);
    let result = api.checkout(request).await.unwrap();
    let account = db.fetch_or_create_account_for_user("user-1").await.unwrap();
    assert_eq!(result.order.entries[0].sender, account.id);
    assert_eq!(result.order.user_id.as_deref(), Some("user-1"));
}

#[tokio::test]
async fn invalid_checkouts_never_reach_the_gateway() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let gateway = MockGateway::new();
    let api = OrderApi::new(db.clone(), gateway.clone());

    let cases = vec![
        (CheckoutRequest::new("VE-042"), ValidationError::EmptyOrder),
        (
            CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, -1),
            ValidationError::NonPositiveQuantity { item_id: catalog.newspaper.id, quantity: -1 },
        ),
        (
            CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, 1).with_entry(catalog.newspaper.id, 1),
            ValidationError::DuplicateItem(catalog.newspaper.id),
        ),
        (
            CheckoutRequest::new("VE-999").with_entry(catalog.newspaper.id, 1),
            ValidationError::UnknownVendor("VE-999".into()),
        ),
        (CheckoutRequest::new("VE-042").with_entry(31337, 1), ValidationError::UnknownItem(31337)),
        (
            CheckoutRequest::new("VE-042").with_entry(catalog.license.id, 1),
            ValidationError::NotForSale(catalog.license.id),
        ),
        (
            CheckoutRequest::new("VE-042").with_entry(catalog.pdf_edition.id, 1),
            ValidationError::MissingCustomerEmail,
        ),
        (
            CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, i64::MAX / 100),
            ValidationError::AmountTooLarge(catalog.newspaper.id),
        ),
        (
            CheckoutRequest::new("VE-042")
                .with_customer_email("reader@example.org")
                .with_entry(catalog.newspaper.id, i64::MAX / catalog.newspaper.price.value())
                .with_entry(catalog.digital_edition.id, 1),
            ValidationError::AmountTooLarge(catalog.digital_edition.id),
        ),
    ];
    for (request, expected) in cases {
        match api.checkout(request).await {
            Err(OrderApiError::Validation(e)) => assert_eq!(e, expected),
            other => panic!("Expected {expected:?}, got {other:?}"),
        }
    }

    db.set_item_disabled(catalog.newspaper.id, true).await.unwrap();
    let request = CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, 1);
    let err = api.checkout(request).await.unwrap_err();
    assert!(matches!(err, OrderApiError::Validation(ValidationError::DisabledItem(_))));

    assert!(gateway.payment_orders().is_empty());
    assert_eq!(count_rows(&db, "orders").await, 0);
}

#[tokio::test]
async fn oversized_entries_are_not_stored() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let customer = singleton(&db, AccountType::AnonymousUser).await;
    let vendor = catalog.vendor_account.id;
    let order = NewOrder::new(OrderCode(3), catalog.vendor.id)
        .with_entry(NewOrderEntry::new(catalog.newspaper.id, i64::MAX / 100, customer.id, vendor));
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, LedgerError::AmountOverflow(id) if id == catalog.newspaper.id));

    let quantity = i64::MAX / catalog.newspaper.price.value();
    let order = NewOrder::new(OrderCode(4), catalog.vendor.id)
        .with_entry(NewOrderEntry::new(catalog.newspaper.id, quantity, customer.id, vendor))
        .with_entry(NewOrderEntry::new(catalog.digital_edition.id, 1, customer.id, vendor));
    let err = db.create_order(order).await.unwrap_err();
    assert!(matches!(err, LedgerError::AmountOverflow(id) if id == catalog.digital_edition.id));

    assert_eq!(count_rows(&db, "orders").await, 0);
    assert_eq!(count_rows(&db, "order_entries").await, 0);
}

#[tokio::test]
async fn price_changes_during_checkout_are_reported() {
    let db = prepare_test_env().await;
    let catalog = seed_catalog(&db).await;
    let gateway = MockGateway::new();
    gateway.reprice_during_next_order(db.pool().clone(), catalog.newspaper.id, Cents::from(2500));
    let api = OrderApi::new(db.clone(), gateway.clone());

    let request = CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, 2);
    match api.checkout(request).await {
        Err(OrderApiError::TotalChanged { order_code, charged, stored }) => {
            assert_eq!(charged, Cents::from(4000));
            assert_eq!(stored, Cents::from(5000));
            let order = api.order_by_code(order_code).await.unwrap().expect("Order was not stored");
            assert!(!order.verified);
        },
        other => panic!("Expected a changed total, got {other:?}"),
    }
    assert_eq!(gateway.payment_orders()[0].amount, Cents::from(4000));

    // Later checkouts charge the new price
    let request = CheckoutRequest::new("VE-042").with_entry(catalog.newspaper.id, 2);
    let result = api.checkout(request).await.unwrap();
    assert_eq!(result.total, Cents::from(5000));
}
