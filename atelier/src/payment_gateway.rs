//! Payment gateway abstraction for refunds.
//!
//! The reservation core never charges cards itself; it only instructs the
//! gateway to return money on cancellation. In production this fronts a
//! provider like Stripe or Adyen; the mock implementations serve
//! development and tests.

use crate::types::Money;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Payment gateway result
pub type GatewayResult<T> = Result<T, PaymentGatewayError>;

/// Payment gateway error
#[derive(Debug, Clone)]
pub enum PaymentGatewayError {
    /// The gateway rejected the refund
    Rejected {
        /// Rejection reason
        reason: String,
    },
    /// Gateway timeout
    Timeout,
    /// Other error
    Other {
        /// Error message
        message: String,
    },
}

impl std::fmt::Display for PaymentGatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rejected { reason } => write!(f, "Refund rejected: {reason}"),
            Self::Timeout => write!(f, "Gateway timeout"),
            Self::Other { message } => write!(f, "Payment error: {message}"),
        }
    }
}

impl std::error::Error for PaymentGatewayError {}

/// Confirmation of an executed refund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    /// Gateway transaction ID
    pub transaction_id: String,
    /// Amount returned
    pub amount: Money,
}

/// Payment gateway trait
///
/// Abstraction over payment processors.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Return `amount` of the payment identified by `payment_reference`.
    ///
    /// # Errors
    ///
    /// Returns an error when the refund fails; the caller records the
    /// failure for reconciliation instead of rolling back the cancellation.
    async fn refund_payment(
        &self,
        payment_reference: &str,
        amount: Money,
    ) -> GatewayResult<RefundReceipt>;
}

/// Mock payment gateway (always succeeds, records issued refunds).
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    refunds: Arc<Mutex<Vec<(String, Money)>>>,
}

impl MockPaymentGateway {
    /// Creates a new mock payment gateway
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refunds issued so far, in call order.
    #[must_use]
    pub fn issued(&self) -> Vec<(String, Money)> {
        match self.refunds.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn refund_payment(
        &self,
        payment_reference: &str,
        amount: Money,
    ) -> GatewayResult<RefundReceipt> {
        match self.refunds.lock() {
            Ok(mut guard) => guard.push((payment_reference.to_string(), amount)),
            Err(poisoned) => poisoned
                .into_inner()
                .push((payment_reference.to_string(), amount)),
        }
        Ok(RefundReceipt {
            transaction_id: format!("mock-refund-{payment_reference}"),
            amount,
        })
    }
}

/// Gateway that fails every refund, for exercising the partial-success
/// cancellation path.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingPaymentGateway;

#[async_trait]
impl PaymentGateway for FailingPaymentGateway {
    async fn refund_payment(
        &self,
        _payment_reference: &str,
        _amount: Money,
    ) -> GatewayResult<RefundReceipt> {
        Err(PaymentGatewayError::Rejected {
            reason: "gateway unavailable".to_string(),
        })
    }
}
