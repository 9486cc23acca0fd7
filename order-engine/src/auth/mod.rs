//! Guest order access tokens

mod guest_token;

pub use guest_token::{GuestClaims, GuestTokenConfig, GuestTokenError, GuestTokenService};
