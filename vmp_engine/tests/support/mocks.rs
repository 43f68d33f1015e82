use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, AtomicU32, Ordering},
        Arc,
        Mutex,
    },
};

use mockall::mock;
use sqlx::SqlitePool;
use vmp_engine::{
    db_types::{Cents, OrderCode},
    gateway::{GatewayError, PaymentGateway, PaymentOrderRequest, TransactionNotice, TransactionRecord},
    DispatchError,
    EntitlementDispatcher,
    Notifier,
};

/// An in-memory gateway. Transactions are registered by the test; order codes are handed out sequentially.
#[derive(Clone, Default)]
pub struct MockGateway {
    transactions: Arc<Mutex<HashMap<String, TransactionRecord>>>,
    requests: Arc<Mutex<Vec<PaymentOrderRequest>>>,
    next_code: Arc<AtomicI64>,
    failures: Arc<AtomicU32>,
    calls: Arc<AtomicU32>,
    reprice: Arc<Mutex<Option<(SqlitePool, i64, Cents)>>>,
}

impl MockGateway {
    pub fn new() -> Self {
        let gateway = Self::default();
        gateway.next_code.store(1_000_000, Ordering::SeqCst);
        gateway
    }

    /// Records a captured payment of `amount` for the order.
    pub fn capture(&self, transaction_id: &str, order_code: OrderCode, amount: Cents) {
        self.register(transaction_id, TransactionRecord {
            order_code,
            amount: amount.to_major(),
            status_id: "F".to_string(),
            transaction_type_id: 5,
            email: None,
            currency_code: Some("EUR".to_string()),
        });
    }

    /// The webhook the gateway would send for a registered transaction.
    pub fn notice(&self, transaction_id: &str) -> TransactionNotice {
        let transactions = self.transactions.lock().unwrap();
        let record = transactions.get(transaction_id).expect("Transaction was not registered");
        record.as_notice(transaction_id)
    }

    pub fn register(&self, transaction_id: &str, record: TransactionRecord) {
        self.transactions.lock().unwrap().insert(transaction_id.to_string(), record);
    }

    /// The next `n` transaction lookups fail as if the gateway were down.
    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// While the next payment order is being created, the item's price is changed to `price`.
    pub fn reprice_during_next_order(&self, pool: SqlitePool, item_id: i64, price: Cents) {
        *self.reprice.lock().unwrap() = Some((pool, item_id, price));
    }

    pub fn payment_orders(&self) -> Vec<PaymentOrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentGateway for MockGateway {
    async fn create_payment_order(&self, request: PaymentOrderRequest) -> Result<OrderCode, GatewayError> {
        self.requests.lock().unwrap().push(request);
        let reprice = self.reprice.lock().unwrap().take();
        if let Some((pool, item_id, price)) = reprice {
            sqlx::query("UPDATE items SET price = $1 WHERE id = $2")
                .bind(price.value())
                .bind(item_id)
                .execute(&pool)
                .await
                .map_err(|e| GatewayError::RequestError(e.to_string()))?;
        }
        Ok(OrderCode(self.next_code.fetch_add(1, Ordering::SeqCst)))
    }

    async fn fetch_transaction(&self, transaction_id: &str) -> Result<TransactionRecord, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let failing = self.failures.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok();
        if failing {
            return Err(GatewayError::RequestError("connection reset".to_string()));
        }
        self.transactions
            .lock()
            .unwrap()
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| GatewayError::TransactionNotFound(transaction_id.to_string()))
    }
}

mock! {
    pub Dispatcher {}
    impl EntitlementDispatcher for Dispatcher {
        async fn assign_license_group(&self, customer: &str, license_group: &str) -> Result<(), DispatchError>;
    }
}

mock! {
    pub Mailer {}
    impl Notifier for Mailer {
        async fn send(&self, recipients: &[String], subject: &str, body: &str) -> Result<(), DispatchError>;
    }
}
