//! Port error to domain error mapping shared by the payment services.
//!
//! Upstream and storage messages are logged here and never copied into the
//! returned error, which may reach the client.

use tracing::error;

use super::Error;
use super::ports::{
    CheckoutGatewayError, PaymentAccountRepositoryError, PixChargeGatewayError,
    PixPaymentRepositoryError, PurchaseRepositoryError,
};

pub(crate) fn map_ledger_error(err: PixPaymentRepositoryError) -> Error {
    error!(error = %err, "pix ledger operation failed");
    Error::internal("payment ledger unavailable")
}

pub(crate) fn map_purchase_error(err: PurchaseRepositoryError) -> Error {
    error!(error = %err, "purchase repository operation failed");
    Error::internal("purchase storage unavailable")
}

pub(crate) fn map_account_error(err: PaymentAccountRepositoryError) -> Error {
    error!(error = %err, "payment account operation failed");
    Error::internal("account storage unavailable")
}

pub(crate) fn map_checkout_gateway_error(err: CheckoutGatewayError) -> Error {
    error!(error = %err, "checkout provider request failed");
    Error::internal("payment provider request failed")
}

pub(crate) fn map_pix_gateway_error(err: PixChargeGatewayError) -> Error {
    error!(error = %err, "pix gateway request failed");
    Error::internal("pix gateway request failed")
}

#[cfg(test)]
pub(crate) mod test_clock {
    //! Deterministic clock for service tests.

    use std::sync::Arc;

    use chrono::{DateTime, Local, TimeZone, Utc};
    use mockable::Clock;

    pub(crate) fn fixture_timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .expect("valid fixture timestamp")
    }

    struct FixtureClock {
        utc_now: DateTime<Utc>,
    }

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.utc_now.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.utc_now
        }
    }

    pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
        Arc::new(FixtureClock {
            utc_now: fixture_timestamp(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;

    #[test]
    fn upstream_messages_do_not_leak_into_domain_errors() {
        let err = map_checkout_gateway_error(CheckoutGatewayError::rejected(
            401_u16,
            "Invalid API Key provided: sk_test_****",
        ));
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(!err.message().contains("sk_test"));
    }

    #[test]
    fn storage_failures_are_internal() {
        let err = map_ledger_error(PixPaymentRepositoryError::connection("refused"));
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
