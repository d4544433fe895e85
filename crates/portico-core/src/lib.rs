//! # Portico Core
//!
//! Core types shared by the Portico bootstrap-and-dispatch crates:
//!
//! - [`ServiceRegistry`]: a string-keyed, lazily resolving dependency
//!   container: named factories produce singleton instances on first
//!   resolution, with deterministic cycle detection
//! - [`Handler`] and [`Flow`]: the contract every pipeline stage
//!   (middleware and controller alike) implements, with an explicit
//!   continue/halt signal
//! - [`RequestContext`]: the mutable, request-scoped state bag passed
//!   through every pipeline stage

#![forbid(unsafe_code)]

mod context;
mod handler;
mod registry;

pub use context::RequestContext;
pub use handler::{Flow, FnHandler, Handler, HandlerError};
pub use registry::{RegistryError, ServiceFactory, ServiceRegistry, Shared};
