//! Domain layer - value objects shared by the ports and adapters.
//!
//! - `token` - access tokens, staleness and expiry resolution
//! - `outcome` - classified result of a single HTTP attempt
//! - `payment` - payment order and initiation shapes

pub mod outcome;
pub mod payment;
pub mod token;

pub use outcome::{Failure, FailureKind, RequestOutcome};
pub use payment::{Customer, PaymentInitiation, PaymentOrder};
pub use token::{resolve_expiry, AccessToken, TokenState, FALLBACK_TTL_SECS};
