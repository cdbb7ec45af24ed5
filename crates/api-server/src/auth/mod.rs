//! Auth primitives: credential store, token service and access guard.
//!
//! Handlers never touch tokens directly; `require_token` and
//! `require_role` are the only two entry points.

mod guard;
mod store;
mod token;

pub use guard::{require_role, require_token};
pub use store::{AuthError, Role, UserStore, UserSummary};
pub use token::{AuthClaims, IssuedToken, TokenError, TokenService};
