//! The pipeline stage contract.
//!
//! Every unit of request processing, middleware stage and terminal
//! controller alike, implements [`Handler`]. A stage receives the shared
//! [`RequestContext`], the opaque configuration data attached to it, and
//! the entry-point name it was referenced with, and answers with an
//! explicit [`Flow`] signal: continue to the next stage, or halt the
//! pipeline. Halting is the designed short-circuit (an authentication
//! stage rejecting a request, say) and is not an error.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

use crate::context::RequestContext;

/// The control signal a stage returns on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Proceed to the next stage in the pipeline.
    Continue,
    /// Stop the pipeline; no further stages execute, and no error is
    /// raised.
    Halt,
}

/// Errors raised by a stage while processing a request.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler was invoked with an entry-point name it does not expose.
    #[error("handler has no entry point named `{action}`")]
    UnknownAction {
        /// The requested entry-point name.
        action: String,
    },

    /// The handler failed while processing the request.
    #[error("{message}")]
    Failed {
        /// Human-readable failure description.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl HandlerError {
    /// Creates a failure with a message only.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a failure wrapping an underlying error.
    pub fn with_source(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Failed {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an unknown entry-point error.
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }
}

/// One unit of request processing.
///
/// Handlers are registered in the service registry by name and referenced
/// from route and middleware tables as `"Service:action"`. A handler with
/// a single entry point conventionally answers to the `run` action.
///
/// # Example
///
/// ```rust
/// use portico_core::{Flow, Handler, HandlerError, RequestContext};
/// use serde_json::{json, Value};
///
/// struct Gate;
///
/// impl Handler for Gate {
///     fn invoke(
///         &self,
///         action: &str,
///         ctx: &mut RequestContext,
///         _data: &Value,
///     ) -> Result<Flow, HandlerError> {
///         match action {
///             "check" if ctx.get("user").is_none() => Ok(Flow::Halt),
///             "check" => Ok(Flow::Continue),
///             other => Err(HandlerError::unknown_action(other)),
///         }
///     }
/// }
/// ```
pub trait Handler: Send + Sync + 'static {
    /// Processes the request through the named entry point.
    ///
    /// `data` is the opaque configuration attached to this stage in the
    /// route or middleware table; it is `Value::Null` for terminal
    /// controller stages.
    fn invoke(
        &self,
        action: &str,
        ctx: &mut RequestContext,
        data: &Value,
    ) -> Result<Flow, HandlerError>;
}

/// A handler backed by a plain function, for single-entry-point stages.
///
/// The wrapped function receives the context and stage data; the
/// entry-point name is ignored, which suits middleware that only ever
/// answers to one action.
///
/// # Example
///
/// ```rust
/// use portico_core::{Flow, FnHandler, Handler, HandlerError, RequestContext};
/// use serde_json::{json, Value};
///
/// let stamp = FnHandler::new(
///     |ctx: &mut RequestContext, _data: &Value| -> Result<Flow, HandlerError> {
///         ctx.set("stamped", json!(true));
///         Ok(Flow::Continue)
///     },
/// );
///
/// let mut ctx = RequestContext::new(http::Method::GET, "/");
/// stamp.invoke("run", &mut ctx, &Value::Null).unwrap();
/// assert_eq!(ctx.get("stamped"), Some(&json!(true)));
/// ```
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    /// Wraps a function as a handler.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext, &Value) -> Result<Flow, HandlerError> + Send + Sync + 'static,
{
    fn invoke(
        &self,
        _action: &str,
        ctx: &mut RequestContext,
        data: &Value,
    ) -> Result<Flow, HandlerError> {
        (self.func)(ctx, data)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde_json::json;

    #[test]
    fn fn_handler_runs_and_mutates_context() {
        let handler = FnHandler::new(
            |ctx: &mut RequestContext, data: &Value| -> Result<Flow, HandlerError> {
                ctx.set("seen", data.clone());
                Ok(Flow::Continue)
            },
        );

        let mut ctx = RequestContext::new(Method::GET, "/x");
        let flow = handler.invoke("run", &mut ctx, &json!({"k": 1})).unwrap();
        assert_eq!(flow, Flow::Continue);
        assert_eq!(ctx.get("seen"), Some(&json!({"k": 1})));
    }

    #[test]
    fn handler_error_messages() {
        let err = HandlerError::unknown_action("render");
        assert!(err.to_string().contains("render"));

        let err = HandlerError::failed("template missing");
        assert_eq!(err.to_string(), "template missing");
    }

    #[test]
    fn handler_error_carries_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = HandlerError::with_source("storage failed", io);
        assert!(std::error::Error::source(&err).is_some());
    }
}
