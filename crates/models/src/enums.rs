//! String-backed value sets stored in `varchar` columns.
//!
//! Each enum round-trips through `as_str` / `FromStr`; rows keep the plain string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name { $($variant),+ }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self { $($name::$variant => $text),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = ModelError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ModelError::Validation(format!(
                        concat!("invalid ", stringify!($name), ": {}"), other
                    ))),
                }
            }
        }
    };
}

string_enum!(
    /// Account role. Admins are provisioned out of band, never self-registered.
    Role { Client => "client", Provider => "provider", Admin => "admin" }
);

string_enum!(
    ProviderStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
        Suspended => "suspended",
    }
);

string_enum!(
    /// Booking lifecycle.
    RequestStatus {
        Pending => "pending",
        Accepted => "accepted",
        Rejected => "rejected",
        InProgress => "in_progress",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

string_enum!(
    PaymentStatus {
        Pending => "pending",
        Approved => "approved",
        InProcess => "in_process",
        Rejected => "rejected",
        Cancelled => "cancelled",
        Refunded => "refunded",
    }
);

string_enum!(DiscountType { Percent => "percent", Fixed => "fixed" });

string_enum!(ChatStatus { Open => "open", Closed => "closed" });

impl RequestStatus {
    /// No further transitions leave these states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed | RequestStatus::Cancelled)
    }
}

impl PaymentStatus {
    /// Approved payments may only be refunded; refunded ones are final.
    pub fn can_move_to(&self, next: PaymentStatus) -> bool {
        match self {
            PaymentStatus::Approved => matches!(next, PaymentStatus::Approved | PaymentStatus::Refunded),
            PaymentStatus::Refunded => next == PaymentStatus::Refunded,
            _ => true,
        }
    }

    /// Map a Mercado Pago payment status onto ours. Unknown values stay pending.
    pub fn from_gateway(status: &str) -> Self {
        match status {
            "approved" | "authorized" => PaymentStatus::Approved,
            "in_process" | "in_mediation" => PaymentStatus::InProcess,
            "rejected" => PaymentStatus::Rejected,
            "cancelled" => PaymentStatus::Cancelled,
            "refunded" | "charged_back" => PaymentStatus::Refunded,
            _ => PaymentStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_variant() {
        for s in RequestStatus::ALL {
            assert_eq!(s.as_str().parse::<RequestStatus>().unwrap(), *s);
        }
        for r in Role::ALL {
            assert_eq!(r.to_string().parse::<Role>().unwrap(), *r);
        }
    }

    #[test]
    fn rejects_unknown_values() {
        assert!("superuser".parse::<Role>().is_err());
        assert!("done".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let v = serde_json::to_value(RequestStatus::InProgress).unwrap();
        assert_eq!(v, serde_json::json!("in_progress"));
    }

    #[test]
    fn settled_payments_never_reopen() {
        assert!(PaymentStatus::Pending.can_move_to(PaymentStatus::Approved));
        assert!(PaymentStatus::Rejected.can_move_to(PaymentStatus::Approved));
        assert!(PaymentStatus::Approved.can_move_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Approved.can_move_to(PaymentStatus::InProcess));
        assert!(!PaymentStatus::Approved.can_move_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_move_to(PaymentStatus::Approved));
    }

    #[test]
    fn gateway_statuses_map() {
        assert_eq!(PaymentStatus::from_gateway("approved"), PaymentStatus::Approved);
        assert_eq!(PaymentStatus::from_gateway("charged_back"), PaymentStatus::Refunded);
        assert_eq!(PaymentStatus::from_gateway("whatever"), PaymentStatus::Pending);
    }
}
