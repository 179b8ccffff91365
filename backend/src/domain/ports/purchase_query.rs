//! Driving port for reading a user's purchases.

use async_trait::async_trait;

use crate::domain::{Error, Purchase, UserId};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseQuery: Send + Sync {
    async fn list_purchases(&self, owner_id: &UserId) -> Result<Vec<Purchase>, Error>;
}
