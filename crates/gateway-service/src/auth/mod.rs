//! Authentication and authorization core for the gateway.
//!
//! Request flow:
//!
//! ```text
//! inbound request -> locator (where is the credential?)
//!                 -> validator (is it genuine and current?)
//!                 -> access (does this identity satisfy the target?)
//! ```
//!
//! # Components
//!
//! - `policy` - Immutable signing policy built once from configuration
//! - `locator` - Transport-aware credential extraction (header / channel query)
//! - `validator` - HMAC JWT verification producing an `IdentityContext`
//! - `identity` - The verified identity bound to one request or connection
//! - `access` - Declarative per-target access requirements

pub mod access;
pub mod identity;
pub mod locator;
pub mod policy;
pub mod validator;

pub use access::{authorize, AccessDecision, AccessRequirement, DenyReason};
pub use identity::IdentityContext;
pub use locator::{ChannelRoute, Credential, CredentialLocator, InboundRequest, TransportKind};
pub use policy::SigningPolicy;
pub use validator::{RejectionReason, TokenValidator};
