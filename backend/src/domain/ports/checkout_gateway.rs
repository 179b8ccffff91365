//! Port for the hosted checkout provider (customers and checkout sessions).

use async_trait::async_trait;

use crate::domain::{
    CheckoutSession, CheckoutSessionDraft, CustomerLookup, NewCustomer, PaymentCustomerId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by checkout provider adapters.
    pub enum CheckoutGatewayError {
        /// The provider could not be reached.
        Transport { message: String } => "checkout provider transport failed: {message}",
        /// The provider did not answer in time.
        Timeout { message: String } => "checkout provider timed out: {message}",
        /// The provider refused the request.
        Rejected { status: u16, message: String } => "checkout provider rejected request ({status}): {message}",
        /// The provider answered with an unexpected payload.
        Decode { message: String } => "checkout provider response invalid: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Check whether a cached customer still exists at the provider.
    ///
    /// "Missing" and "deleted" are answers, reported as
    /// [`CustomerLookup::Gone`]; only transport or protocol failures are
    /// errors.
    async fn retrieve_customer(
        &self,
        customer_id: &PaymentCustomerId,
    ) -> Result<CustomerLookup, CheckoutGatewayError>;

    /// Provision a new customer.
    async fn create_customer(
        &self,
        customer: &NewCustomer,
    ) -> Result<PaymentCustomerId, CheckoutGatewayError>;

    /// Open a hosted checkout session.
    async fn create_session(
        &self,
        draft: &CheckoutSessionDraft,
    ) -> Result<CheckoutSession, CheckoutGatewayError>;
}
