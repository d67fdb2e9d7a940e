//! Ports - Interfaces between the gateway client and the outside world.
//!
//! - `payment_gateway` - the client contract and its error taxonomy
//! - `http_transport` - a single HTTP exchange
//! - `token_cache` - persisted access tokens
//! - `clock` - current time

mod clock;
mod http_transport;
mod payment_gateway;
mod token_cache;

pub use clock::{Clock, SystemClock};
pub use http_transport::{GatewayRequest, HttpTransport, RequestBody};
pub use payment_gateway::{
    ApiRequest, GatewayError, GatewayErrorKind, PaymentGateway, MAX_ERROR_BODY_CHARS,
};
pub use token_cache::{TokenCache, TokenCacheError};
