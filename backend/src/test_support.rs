//! In-memory adapters for integration tests.
//!
//! Enabled by the `test-support` feature. Each store serialises access behind
//! a mutex, which gives the same all-or-nothing behaviour as the database's
//! unique constraints and guarded updates.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::ports::{
    CheckoutGateway, CheckoutGatewayError, PaymentAccountRepository,
    PaymentAccountRepositoryError, PixChargeGateway, PixChargeGatewayError, PixPaymentRepository,
    PixPaymentRepositoryError, PurchaseRepository, PurchaseRepositoryError, RecordOutcome,
    TransitionOutcome, TransitionRequest,
};
use crate::domain::{
    CheckoutSession, CheckoutSessionDraft, CustomerLookup, NewCustomer, NotificationId,
    PaymentAccount, PaymentCustomerId, PixCharge, PixChargeRequest, PixPayment, Purchase,
    PurchaseId, TransactionId, UserId,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clock that only moves when told to.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = TimeDelta::from_std(delta).unwrap_or(TimeDelta::MAX);
        *lock(&self.0) += delta;
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Append-only PIX ledger keyed by transaction id.
#[derive(Default)]
pub struct InMemoryPixLedger {
    payments: Mutex<HashMap<TransactionId, PixPayment>>,
}

impl InMemoryPixLedger {
    pub fn len(&self) -> usize {
        lock(&self.payments).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, transaction_id: &TransactionId) -> Option<PixPayment> {
        lock(&self.payments).get(transaction_id).cloned()
    }
}

#[async_trait]
impl PixPaymentRepository for InMemoryPixLedger {
    async fn exists(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<bool, PixPaymentRepositoryError> {
        Ok(lock(&self.payments).contains_key(transaction_id))
    }

    async fn insert_if_absent(
        &self,
        payment: &PixPayment,
    ) -> Result<RecordOutcome, PixPaymentRepositoryError> {
        let mut payments = lock(&self.payments);
        if payments.contains_key(&payment.transaction_id) {
            return Ok(RecordOutcome::AlreadyExists);
        }
        payments.insert(payment.transaction_id.clone(), payment.clone());
        Ok(RecordOutcome::Inserted)
    }

    async fn find(
        &self,
        transaction_id: &TransactionId,
    ) -> Result<Option<PixPayment>, PixPaymentRepositoryError> {
        Ok(self.get(transaction_id))
    }
}

#[derive(Default)]
struct PurchaseTables {
    purchases: HashMap<PurchaseId, Purchase>,
    notifications: HashMap<NotificationId, Option<DateTime<Utc>>>,
}

/// Purchases plus the notification read markers consumption touches.
#[derive(Default)]
pub struct InMemoryPurchaseStore {
    tables: Mutex<PurchaseTables>,
}

impl InMemoryPurchaseStore {
    /// Seed a purchase directly, bypassing the checkout webhook.
    pub fn insert(&self, purchase: Purchase) {
        lock(&self.tables).purchases.insert(purchase.id, purchase);
    }

    /// Create an unread notification.
    pub fn add_notification(&self) -> NotificationId {
        let id = NotificationId::from_uuid(Uuid::new_v4());
        lock(&self.tables).notifications.insert(id, None);
        id
    }

    pub fn notification_read_at(&self, id: NotificationId) -> Option<DateTime<Utc>> {
        lock(&self.tables).notifications.get(&id).copied().flatten()
    }

    pub fn get(&self, id: PurchaseId) -> Option<Purchase> {
        lock(&self.tables).purchases.get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Purchase> {
        lock(&self.tables).purchases.values().cloned().collect()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseStore {
    async fn find_by_checkout_session(
        &self,
        checkout_session_id: &str,
    ) -> Result<Option<Purchase>, PurchaseRepositoryError> {
        Ok(lock(&self.tables)
            .purchases
            .values()
            .find(|purchase| purchase.checkout_session_id == checkout_session_id)
            .cloned())
    }

    async fn insert_if_absent(
        &self,
        purchase: &Purchase,
    ) -> Result<RecordOutcome, PurchaseRepositoryError> {
        let mut tables = lock(&self.tables);
        let taken = tables.purchases.values().any(|existing| {
            existing.id == purchase.id
                || existing.checkout_session_id == purchase.checkout_session_id
        });
        if taken {
            return Ok(RecordOutcome::AlreadyExists);
        }
        tables.purchases.insert(purchase.id, purchase.clone());
        Ok(RecordOutcome::Inserted)
    }

    async fn find_by_id(
        &self,
        id: &PurchaseId,
    ) -> Result<Option<Purchase>, PurchaseRepositoryError> {
        Ok(self.get(*id))
    }

    async fn list_for_owner(
        &self,
        owner_id: &UserId,
    ) -> Result<Vec<Purchase>, PurchaseRepositoryError> {
        let mut owned: Vec<Purchase> = lock(&self.tables)
            .purchases
            .values()
            .filter(|purchase| &purchase.owner_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.as_uuid().cmp(b.id.as_uuid()))
        });
        Ok(owned)
    }

    async fn apply_transition(
        &self,
        request: &TransitionRequest,
    ) -> Result<TransitionOutcome, PurchaseRepositoryError> {
        let mut tables = lock(&self.tables);
        let Some(purchase) = tables.purchases.get_mut(&request.purchase_id) else {
            return Ok(TransitionOutcome::NotApplied);
        };
        let owner_matches = request
            .owner_id
            .as_ref()
            .is_none_or(|owner| owner == &purchase.owner_id);
        if !owner_matches || purchase.submission_status != request.transition.from {
            return Ok(TransitionOutcome::NotApplied);
        }

        purchase.submission_status = request.transition.to;
        purchase.updated_at = request.at;
        let updated = purchase.clone();

        if let Some(read_at) = request
            .notification_id
            .and_then(|id| tables.notifications.get_mut(&id))
        {
            read_at.get_or_insert(request.at);
        }
        Ok(TransitionOutcome::Applied(updated))
    }
}

/// Payment accounts keyed by user id.
#[derive(Default)]
pub struct InMemoryPaymentAccounts {
    accounts: Mutex<HashMap<UserId, PaymentAccount>>,
}

impl InMemoryPaymentAccounts {
    pub fn insert(&self, account: PaymentAccount) {
        lock(&self.accounts).insert(account.user_id.clone(), account);
    }

    pub fn get(&self, user_id: &UserId) -> Option<PaymentAccount> {
        lock(&self.accounts).get(user_id).cloned()
    }
}

#[async_trait]
impl PaymentAccountRepository for InMemoryPaymentAccounts {
    async fn find(
        &self,
        user_id: &UserId,
    ) -> Result<Option<PaymentAccount>, PaymentAccountRepositoryError> {
        Ok(self.get(user_id))
    }

    async fn store_customer_id(
        &self,
        user_id: &UserId,
        customer_id: &PaymentCustomerId,
    ) -> Result<(), PaymentAccountRepositoryError> {
        let mut accounts = lock(&self.accounts);
        let account = accounts
            .get_mut(user_id)
            .ok_or_else(|| PaymentAccountRepositoryError::query("account vanished"))?;
        account.payment_customer_id = Some(customer_id.clone());
        Ok(())
    }
}

#[derive(Default)]
struct CheckoutLog {
    customers: HashSet<String>,
    created_customers: Vec<NewCustomer>,
    sessions: Vec<CheckoutSessionDraft>,
}

/// Checkout processor double that knows a fixed set of live customers.
#[derive(Default)]
pub struct FakeCheckoutGateway {
    log: Mutex<CheckoutLog>,
}

impl FakeCheckoutGateway {
    /// Register a customer the processor still knows about.
    pub fn with_customer(self, customer_id: &str) -> Self {
        lock(&self.log).customers.insert(customer_id.to_owned());
        self
    }

    pub fn created_customers(&self) -> Vec<NewCustomer> {
        lock(&self.log).created_customers.clone()
    }

    pub fn sessions(&self) -> Vec<CheckoutSessionDraft> {
        lock(&self.log).sessions.clone()
    }
}

#[async_trait]
impl CheckoutGateway for FakeCheckoutGateway {
    async fn retrieve_customer(
        &self,
        customer_id: &PaymentCustomerId,
    ) -> Result<CustomerLookup, CheckoutGatewayError> {
        if lock(&self.log).customers.contains(customer_id.as_ref()) {
            Ok(CustomerLookup::Active)
        } else {
            Ok(CustomerLookup::Gone)
        }
    }

    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<PaymentCustomerId, CheckoutGatewayError> {
        let mut log = lock(&self.log);
        let id = format!("cus_fake_{}", log.created_customers.len() + 1);
        log.customers.insert(id.clone());
        log.created_customers.push(customer.clone());
        PaymentCustomerId::new(id).map_err(|err| CheckoutGatewayError::decode(err.to_string()))
    }

    async fn create_session(
        &self,
        draft: &CheckoutSessionDraft,
    ) -> Result<CheckoutSession, CheckoutGatewayError> {
        let mut log = lock(&self.log);
        let id = format!("cs_fake_{}", log.sessions.len() + 1);
        log.sessions.push(draft.clone());
        Ok(CheckoutSession {
            url: format!("https://checkout.test/{id}"),
            id,
        })
    }
}

/// PIX gateway double that accepts every charge.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptingPixGateway;

#[async_trait]
impl PixChargeGateway for AcceptingPixGateway {
    async fn create_charge(
        &self,
        transaction_id: &TransactionId,
        request: &PixChargeRequest,
    ) -> Result<PixCharge, PixChargeGatewayError> {
        Ok(PixCharge {
            transaction_id: transaction_id.clone(),
            status: "ATIVA".to_owned(),
            copy_paste: Some(format!("pix:{transaction_id}:{}", request.amount)),
        })
    }
}
