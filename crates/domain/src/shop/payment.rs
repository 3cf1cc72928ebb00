//! Payment intent statuses as reported by the payment provider.

use serde::{Deserialize, Serialize};

use super::order::OrderStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentIntentStatus {
    Canceled,
    Processing,
    RequiresAction,
    RequiresCapture,
    RequiresConfirmation,
    RequiresPaymentMethod,
    Succeeded,
}

impl PaymentIntentStatus {
    /// The order status implied by this intent status.
    pub fn order_status(&self) -> OrderStatus {
        match self {
            PaymentIntentStatus::Canceled => OrderStatus::Cancelled,
            PaymentIntentStatus::Processing
            | PaymentIntentStatus::RequiresAction
            | PaymentIntentStatus::RequiresCapture
            | PaymentIntentStatus::RequiresConfirmation
            | PaymentIntentStatus::RequiresPaymentMethod => OrderStatus::Pending,
            PaymentIntentStatus::Succeeded => OrderStatus::Paid,
        }
    }
}
