//! Hosted checkout provisioning with self-healing processor customers.
//!
//! The locally cached customer id is re-verified against the processor on
//! every checkout. When the processor no longer knows it, a replacement is
//! provisioned and cached before the session is opened.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::ports::{CheckoutCommand, CheckoutGateway, PaymentAccountRepository};
use super::service_support::{map_account_error, map_checkout_gateway_error};
use super::{
    CheckoutMode, CheckoutRequest, CheckoutSession, CheckoutSessionDraft, CheckoutUrls,
    CustomerLookup, Error, METADATA_PRODUCT_ID, METADATA_PURCHASE_TYPE, METADATA_USER_ID,
    NewCustomer, PaymentAccount, PaymentCustomerId, PriceCatalogue, PurchaseType, UserId,
};

/// Checkout service implementing [`CheckoutCommand`].
pub struct CheckoutService<A, G> {
    accounts: Arc<A>,
    gateway: Arc<G>,
    catalogue: PriceCatalogue,
    urls: CheckoutUrls,
}

impl<A, G> CheckoutService<A, G> {
    /// Create a service over the account store and the checkout provider.
    pub fn new(
        accounts: Arc<A>,
        gateway: Arc<G>,
        catalogue: PriceCatalogue,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            accounts,
            gateway,
            catalogue,
            urls,
        }
    }
}

impl<A, G> CheckoutService<A, G>
where
    A: PaymentAccountRepository,
    G: CheckoutGateway,
{
    /// Resolve the purchase type a payment-mode price sells.
    ///
    /// An unknown price is a deployment fault, not a client error: the
    /// storefront only offers configured prices.
    fn resolve_purchase_type(&self, request: &CheckoutRequest) -> Result<Option<PurchaseType>, Error> {
        match request.mode {
            CheckoutMode::Subscription => Ok(None),
            CheckoutMode::Payment => match self.catalogue.resolve(&request.price_id) {
                Some(kind) => Ok(Some(kind)),
                None => {
                    error!(price_id = %request.price_id, "price id missing from the price catalogue");
                    Err(Error::internal("price is not configured for one-time purchases"))
                }
            },
        }
    }

    async fn ensure_customer(&self, account: &PaymentAccount) -> Result<PaymentCustomerId, Error> {
        if let Some(cached) = &account.payment_customer_id {
            let lookup = self
                .gateway
                .retrieve_customer(cached)
                .await
                .map_err(map_checkout_gateway_error)?;
            match lookup {
                CustomerLookup::Active => return Ok(cached.clone()),
                CustomerLookup::Gone => warn!(
                    user_id = %account.user_id,
                    customer_id = %cached,
                    "cached payment customer is gone; provisioning a replacement"
                ),
            }
        }

        let created = self
            .gateway
            .create_customer(&NewCustomer::from(account))
            .await
            .map_err(map_checkout_gateway_error)?;
        self.accounts
            .store_customer_id(&account.user_id, &created)
            .await
            .map_err(map_account_error)?;
        info!(user_id = %account.user_id, customer_id = %created, "payment customer provisioned");
        Ok(created)
    }

    fn draft(
        &self,
        user_id: &UserId,
        customer_id: PaymentCustomerId,
        request: CheckoutRequest,
        purchase_type: Option<PurchaseType>,
    ) -> CheckoutSessionDraft {
        let mut metadata = vec![(METADATA_USER_ID, user_id.to_string())];
        if let Some(product_id) = request.product_id {
            metadata.push((METADATA_PRODUCT_ID, product_id));
        }
        if let Some(kind) = purchase_type {
            metadata.push((METADATA_PURCHASE_TYPE, kind.as_str().to_owned()));
        }

        CheckoutSessionDraft {
            customer_id,
            price_id: request.price_id,
            mode: request.mode,
            success_url: self.urls.success_url.clone(),
            cancel_url: self.urls.cancel_url.clone(),
            metadata,
        }
    }
}

#[async_trait]
impl<A, G> CheckoutCommand for CheckoutService<A, G>
where
    A: PaymentAccountRepository,
    G: CheckoutGateway,
{
    async fn create_checkout_session(
        &self,
        user_id: &UserId,
        request: CheckoutRequest,
    ) -> Result<CheckoutSession, Error> {
        let purchase_type = self.resolve_purchase_type(&request)?;
        let account = self
            .accounts
            .find(user_id)
            .await
            .map_err(map_account_error)?
            .ok_or_else(|| Error::not_found("user account not found"))?;

        let customer_id = self.ensure_customer(&account).await?;
        let draft = self.draft(user_id, customer_id, request, purchase_type);
        let session = self
            .gateway
            .create_session(&draft)
            .await
            .map_err(map_checkout_gateway_error)?;
        info!(%user_id, session_id = %session.id, mode = draft.mode.as_str(), "checkout session created");
        Ok(session)
    }
}
