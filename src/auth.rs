//! Auth-domain identifiers, secrets, principals, and pending login state.

pub mod id;
pub mod principal;
pub mod secret;

pub use id::*;
pub use principal::*;
pub use secret::*;
