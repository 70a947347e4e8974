//! Identity-provider environments (data), the registry that resolves them, and strategies
//! (behavior).
//!
//! `environment` exposes validated per-environment metadata (endpoints, connected-app
//! credentials, callback URL). `registry` freezes the set of environments at startup and resolves
//! identifiers to configs. `strategy` defines [`ProviderStrategy`], an HTTP-client-agnostic hook
//! that maps token-endpoint failures into the service error taxonomy.

pub mod environment;
pub mod registry;
pub mod strategy;

pub use environment::*;
pub use registry::*;
pub use strategy::*;
