//! # Portico Middleware
//!
//! The ordered handler pipeline of the Portico dispatch core.
//!
//! A [`Pipeline`] is an ordered, named sequence of stages assembled per
//! request: globally registered stages first, then the stages attached to
//! the matched route, then the terminal controller stage. The driver
//! executes stages strictly in that order, one at a time, resolving each
//! stage's handler from the service registry; a stage that answers
//! [`Flow::Halt`](portico_core::Flow::Halt) stops the pipeline without an
//! error; this is the designed short-circuit mechanism.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use portico_core::{Flow, FnHandler, RequestContext, ServiceRegistry};
//! use portico_middleware::Pipeline;
//! use portico_router::HandlerRef;
//! use serde_json::{json, Value};
//!
//! use portico_core::HandlerError;
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register_handler(
//!     "Stamp",
//!     Arc::new(FnHandler::new(
//!         |ctx: &mut RequestContext, _: &Value| -> Result<Flow, HandlerError> {
//!             ctx.set("stamped", json!(true));
//!             Ok(Flow::Continue)
//!         },
//!     )),
//! );
//!
//! let mut pipeline = Pipeline::new();
//! pipeline.add(HandlerRef::parse("Stamp"), Value::Null);
//!
//! let mut ctx = RequestContext::new(Method::GET, "/");
//! let report = pipeline.run(&registry, &mut ctx).unwrap();
//! assert_eq!(report.executed, 1);
//! assert!(!report.halted);
//! ```

#![forbid(unsafe_code)]

mod pipeline;

pub use pipeline::{Pipeline, PipelineError, PipelineReport};
