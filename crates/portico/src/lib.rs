//! # Portico
//!
//! **Bootstrap-and-dispatch core for request-handling applications**
//!
//! Portico wires together the pieces a request-handling application needs
//! before the first handler runs, and decides which handler chain
//! processes each incoming request:
//!
//! - 🧩 **Lazy service registry**: named factories, singleton instances,
//!   deterministic cycle detection
//! - 🌍 **Locale resolution**: URI-prefix detection with host-based and
//!   ordered fallbacks
//! - 🗂 **Cascading configuration**: locale- and environment-specific
//!   document overrides (`name.locale.local` > `name.local` >
//!   `name.locale` > `name`)
//! - 🚦 **Registration-order routing**: with the full 200/404/405
//!   decision tree
//! - ⛓ **Ordered handler pipeline**: global stages, route stages,
//!   terminal controller, with explicit continue/halt flow
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use portico::prelude::*;
//!
//! let setup = AppSetup::new()
//!     .handler("Blog", Arc::new(BlogController))
//!     .handler("Auth", Arc::new(AuthMiddleware));
//!
//! let env = BootstrapEnv::new("/en/posts", "example.com");
//! let app = Application::boot(Path::new("config"), &env, setup)?;
//!
//! let outcome = app.handle(Method::GET, "/en/posts")?;
//! assert_eq!(outcome.status(), StatusCode::OK);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! boot:    app config → base URI → locale → resources → services → routes
//! request: match (200/404/405) → global stages → route stages → terminal
//! ```

#![doc(html_root_url = "https://docs.rs/portico/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export component crates
pub use portico_config as config;
pub use portico_core as core;
pub use portico_middleware as middleware;
pub use portico_router as router;

mod app;
mod language;
mod services;
mod settings;

pub use app::{
    AppError, AppSetup, Application, BootstrapEnv, DispatchOutcome, CONFIG_SERVICE,
    COOKIE_SERVICE, CSRF_SERVICE, ERROR_REPORTER_SERVICE, METHOD_NOT_ALLOWED_HANDLER,
    NOT_FOUND_HANDLER, ROUTER_SERVICE, SESSION_SERVICE, SETTINGS_SERVICE, TOKEN_SERVICE,
};
pub use language::{
    DefaultLocaleRule, LanguageError, LanguageResolver, LanguageTable, Locale, LocaleSpec,
};
pub use services::{
    CookieConfig, CookieService, CsrfConfig, CsrfService, ErrorReporter, SessionConfig,
    SessionService, TokenService,
};
pub use settings::RuntimeSettings;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use portico::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AppError, AppSetup, Application, BootstrapEnv, DispatchOutcome, ErrorReporter, Locale,
        RuntimeSettings,
    };

    pub use portico_core::{
        Flow, FnHandler, Handler, HandlerError, RegistryError, RequestContext, ServiceRegistry,
    };

    pub use portico_config::{ConfigDocument, ConfigError, ConfigResolver, ConfigStore};

    pub use portico_router::{HandlerRef, Params, Route, RouteMatch, Router, StageSpec};

    pub use portico_middleware::{Pipeline, PipelineError, PipelineReport};
}
