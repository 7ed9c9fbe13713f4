//! Broker status normalization.
//!
//! Each broker SDK reports order state in its own vocabulary. Everything is
//! mapped onto the canonical [`OrderStatus`](super::OrderStatus) before any
//! transition is attempted, keeping the state machine broker-agnostic.

use super::lifecycle::OrderStatus;

/// Map a broker-reported status string onto the canonical enum.
///
/// Returns `None` for strings that carry no state change (for example a
/// rejected *cancel* leaves the order live) or that are simply unknown;
/// callers should log those and leave the local record alone.
pub fn normalize_remote_status(raw: &str) -> Option<OrderStatus> {
    match raw {
        "NEW" | "PendingNew" => Some(OrderStatus::New),
        "ACKED" | "Accepted" | "NoTradeQueueing" | "NoTradeNotQueueing" => {
            Some(OrderStatus::Acked)
        }
        "PARTIAL" | "PartiallyFilled" | "PartTradedQueueing" | "PartTradedNotQueueing" => {
            Some(OrderStatus::Partial)
        }
        "FILLED" | "Filled" | "AllTraded" => Some(OrderStatus::Filled),
        "CANCELING" | "Canceling" | "PendingCancel" => Some(OrderStatus::Canceling),
        "CANCELED" | "Canceled" | "Cancelled" | "AllCanceled" => Some(OrderStatus::Canceled),
        "REJECTED" | "Rejected" | "InsertRejected" => Some(OrderStatus::Rejected),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ctp_style_reports_normalize() {
        assert_eq!(
            normalize_remote_status("PartTradedQueueing"),
            Some(OrderStatus::Partial)
        );
        assert_eq!(normalize_remote_status("AllTraded"), Some(OrderStatus::Filled));
        assert_eq!(
            normalize_remote_status("InsertRejected"),
            Some(OrderStatus::Rejected)
        );
        assert_eq!(normalize_remote_status("AllCanceled"), Some(OrderStatus::Canceled));
    }

    #[test]
    fn canonical_names_pass_through() {
        assert_eq!(normalize_remote_status("NEW"), Some(OrderStatus::New));
        assert_eq!(normalize_remote_status("CANCELING"), Some(OrderStatus::Canceling));
    }

    #[test]
    fn unknown_and_non_state_strings_are_none() {
        assert_eq!(normalize_remote_status("CancelRejected"), None);
        assert_eq!(normalize_remote_status("garbage"), None);
        assert_eq!(normalize_remote_status(""), None);
    }
}
