//! The application orchestrator: startup wiring and per-request dispatch.

use std::path::Path;
use std::sync::Arc;

use http::Method;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use portico_config::{ConfigDocument, ConfigError, ConfigResolver, ConfigStore};
use portico_core::{
    Flow, FnHandler, Handler, HandlerError, RegistryError, RequestContext, ServiceFactory,
    ServiceRegistry, Shared,
};
use portico_middleware::{Pipeline, PipelineError, PipelineReport};
use portico_router::{HandlerRef, RouteMatch, Router, StageSpec};

use crate::language::{DefaultLocaleRule, LanguageError, LanguageResolver, LanguageTable};
use crate::services::{
    CookieConfig, CookieService, CsrfConfig, CsrfService, ErrorReporter, SessionConfig,
    SessionService, TokenService,
};
use crate::settings::RuntimeSettings;

/// Registry name of the shared configuration store.
pub const CONFIG_SERVICE: &str = "Config";
/// Registry name of the published runtime settings.
pub const SETTINGS_SERVICE: &str = "Settings";
/// Registry name of the cookie service.
pub const COOKIE_SERVICE: &str = "Cookie";
/// Registry name of the session service.
pub const SESSION_SERVICE: &str = "Session";
/// Registry name of the token service.
pub const TOKEN_SERVICE: &str = "Token";
/// Registry name of the CSRF service.
pub const CSRF_SERVICE: &str = "Csrf";
/// Registry name of the startup-built router.
pub const ROUTER_SERVICE: &str = "Router";
/// Registry name of the optional error-reporting service.
pub const ERROR_REPORTER_SERVICE: &str = "ErrorReporter";

/// Terminal handler invoked for unmatched paths.
pub const NOT_FOUND_HANDLER: &str = "NotFound";
/// Terminal handler invoked for disallowed methods.
pub const METHOD_NOT_ALLOWED_HANDLER: &str = "MethodNotAllowed";

const CONTAINER_DIR: &str = "container";
const MIDDLEWARE_DIR: &str = "middleware";
const ROUTES_DIR: &str = "routes";

/// Errors fatal to startup or to one request.
#[derive(Error, Debug)]
pub enum AppError {
    /// A configuration document is missing or malformed.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// Locale resolution failed.
    #[error("language resolution error")]
    Language(#[from] LanguageError),

    /// Service wiring failed.
    #[error("service registry error")]
    Registry(#[from] RegistryError),

    /// The request pipeline failed.
    #[error("request pipeline error")]
    Pipeline(#[from] PipelineError),

    /// A route table entry is malformed.
    #[error("invalid route `{name}`: {reason}")]
    Route {
        /// The route name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// Environment-derived inputs, read once at startup and treated as
/// immutable: the bootstrap request's URI and the serving host.
#[derive(Debug, Clone)]
pub struct BootstrapEnv {
    /// The bootstrap request URI (locale detection input).
    pub request_uri: String,
    /// The serving host name (default-locale rule input, base URL part).
    pub host: String,
    /// True when the application is served over TLS.
    pub secure: bool,
}

impl BootstrapEnv {
    /// Creates a plain-HTTP bootstrap environment.
    #[must_use]
    pub fn new(request_uri: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            request_uri: request_uri.into(),
            host: host.into(),
            secure: false,
        }
    }

    /// Marks the environment as served over TLS.
    #[must_use]
    pub fn secure(mut self) -> Self {
        self.secure = true;
        self
    }

    fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }
}

type ReporterFactory =
    Box<dyn Fn(&ServiceRegistry) -> Result<Arc<dyn ErrorReporter>, RegistryError> + Send + Sync>;

/// Code-side registrations the configuration documents cannot carry:
/// service and model factories, pipeline handlers, and the optional
/// error-reporter factory.
///
/// The `services`/`models` documents contribute per-entry configuration
/// (merged into the config store); the factories themselves are registered
/// here, after every core service, so they may reference core services by
/// name.
#[derive(Default)]
pub struct AppSetup {
    services: Vec<(String, ServiceFactory)>,
    models: Vec<(String, ServiceFactory)>,
    handlers: Vec<(String, Arc<dyn Handler>)>,
    error_reporter: Option<ReporterFactory>,
}

impl AppSetup {
    /// Creates an empty setup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user-defined service factory.
    #[must_use]
    pub fn service<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<Shared, RegistryError> + Send + Sync + 'static,
    {
        self.services.push((name.into(), Box::new(factory)));
        self
    }

    /// Registers a user-defined model factory.
    #[must_use]
    pub fn model<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<Shared, RegistryError> + Send + Sync + 'static,
    {
        self.models.push((name.into(), Box::new(factory)));
        self
    }

    /// Registers a pipeline handler (controller or middleware).
    #[must_use]
    pub fn handler(mut self, name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        self.handlers.push((name.into(), handler));
        self
    }

    /// Registers the error-reporting collaborator. Its construction at the
    /// end of startup installs process-wide error handling.
    #[must_use]
    pub fn error_reporter<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ServiceRegistry) -> Result<Arc<dyn ErrorReporter>, RegistryError>
            + Send
            + Sync
            + 'static,
    {
        self.error_reporter = Some(Box::new(factory));
        self
    }
}

/// The `app` section of the primary configuration document.
#[derive(Debug, Deserialize)]
struct AppSection {
    #[serde(default)]
    mode: String,
    #[serde(default)]
    base_uri: String,
    languages: LanguageTable,
    default_language: DefaultLocaleRule,
}

/// One entry of the `routes` document.
#[derive(Debug, Deserialize)]
struct RouteSpec {
    methods: Vec<String>,
    uri: String,
    controller: String,
    #[serde(default)]
    mw: IndexMap<String, Value>,
}

/// The outcome of one dispatched request.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// The request context after the pipeline ran, carrying every stage's
    /// mutations, the match classification and placeholder values.
    pub context: RequestContext,
    /// Stage accounting for the run.
    pub report: PipelineReport,
}

impl DispatchOutcome {
    /// The dispatch status classification (200, 404 or 405).
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        self.context.status()
    }
}

/// The orchestrator.
///
/// [`Application::boot`] runs configuration resolution and locale
/// detection once, wires core and user services into the registry, and
/// loads the middleware and route tables. [`Application::handle`] then
/// dispatches requests against that immutable wiring: each request gets
/// its own router instance, pipeline, and context.
pub struct Application {
    registry: ServiceRegistry,
    settings: RuntimeSettings,
    global_stages: Vec<StageSpec>,
    not_found: HandlerRef,
    method_not_allowed: HandlerRef,
}

impl Application {
    /// Boots the application from a configuration directory.
    ///
    /// Startup order: primary `app` document (local override preferred),
    /// base URI sanitation, locale resolution, `resources` merge into the
    /// shared store, `services`/`models`/`middleware`/`routes` cascades,
    /// core service registration ahead of user registrations, and the
    /// optional eager error-reporter resolution. Every document is loaded
    /// exactly once. Any failure aborts the boot before a request can be
    /// served.
    pub fn boot(
        config_dir: &Path,
        env: &BootstrapEnv,
        setup: AppSetup,
    ) -> Result<Self, AppError> {
        let mut resolver = ConfigResolver::new();

        // The locale is unknown until the app document is read, so only
        // the `.local` tier participates in this first load.
        let app_doc = resolver.load("app", config_dir, true)?;
        let app: AppSection = app_doc.section("app")?;

        let base_uri = RuntimeSettings::sanitize_base_uri(&app.base_uri);
        let debug = app.mode == "development";

        let locale = LanguageResolver::resolve(
            &env.request_uri,
            &base_uri,
            &app.languages,
            &app.default_language,
            &env.host,
        )?;
        let settings = RuntimeSettings::new(debug, base_uri, env.scheme(), &env.host, locale);
        info!(
            locale = %settings.locale().code,
            base_url = settings.base_url(),
            debug = settings.debug(),
            "application booting"
        );
        resolver.set_locale(&settings.locale().code);

        // Merge the app document and the resources cascade into the
        // shared configuration store.
        let mut store = ConfigStore::new();
        store.merge(app_doc);
        store.merge(resolver.load("resources", config_dir, true)?);

        // The container documents contribute per-service configuration;
        // the factories themselves arrive through AppSetup.
        let container_dir = config_dir.join(CONTAINER_DIR);
        store.merge_into(
            "services",
            resolver.load("services", &container_dir, false)?.into_entries(),
        );
        store.merge_into(
            "models",
            resolver.load("models", &container_dir, false)?.into_entries(),
        );

        let middleware_doc =
            resolver.load("middleware", &config_dir.join(MIDDLEWARE_DIR), false)?;
        let global_stages: Vec<StageSpec> = middleware_doc
            .entries()
            .map(|(reference, data)| StageSpec::new(HandlerRef::parse(reference), data.clone()))
            .collect();
        debug!(stages = global_stages.len(), "global middleware table loaded");

        let routes_doc = resolver.load("routes", &config_dir.join(ROUTES_DIR), false)?;
        let router = Self::build_router(&routes_doc)?;
        info!(routes = router.len(), "route table loaded");

        let mut registry = ServiceRegistry::new();
        Self::register_core_services(&mut registry, store, settings.clone(), router);

        // User-defined registrations come after every core service, since
        // their factories may reference core services by name.
        for (name, factory) in setup.services {
            registry.register(name, factory);
        }
        for (name, factory) in setup.models {
            registry.register(name, factory);
        }
        for (name, handler) in setup.handlers {
            registry.register_handler(name, handler);
        }

        if let Some(reporter_factory) = setup.error_reporter {
            registry.register(ERROR_REPORTER_SERVICE, move |r| {
                let reporter = reporter_factory(r)?;
                Ok(Arc::new(reporter) as Shared)
            });
        }
        // Constructing the reporter installs process-wide error handling;
        // this is the one intentional eager resolution.
        if registry.contains(ERROR_REPORTER_SERVICE) {
            registry.resolve(ERROR_REPORTER_SERVICE)?;
        }

        Ok(Self {
            registry,
            settings,
            global_stages,
            not_found: HandlerRef::parse(NOT_FOUND_HANDLER),
            method_not_allowed: HandlerRef::parse(METHOD_NOT_ALLOWED_HANDLER),
        })
    }

    /// Dispatches one request.
    ///
    /// Matches the path against a request-owned router instance, assembles
    /// the pipeline (global stages, then route stages, then the terminal
    /// stage) and runs it. On a 404/405 classification the terminal stage
    /// is the fixed fallback handler and route-specific stages are
    /// skipped. Pipeline failures are surfaced through the error reporter
    /// when one is installed, then returned.
    pub fn handle(&self, method: Method, path: &str) -> Result<DispatchOutcome, AppError> {
        let base: Arc<Router> = self.registry.resolve_as(ROUTER_SERVICE)?;
        // Each request gets its own router instance assembled from the
        // immutable startup table.
        let router: Router = (*base).clone();

        let route_path = self.route_path(path);
        let outcome = router.match_route(&method, &route_path);

        let mut ctx = RequestContext::new(method, route_path)
            .with_locale(self.settings.locale().code.clone());
        ctx.set_status(outcome.status());

        let mut pipeline = Pipeline::new();
        for stage in &self.global_stages {
            pipeline.add_spec(stage.clone());
        }

        match outcome {
            RouteMatch::Matched { route, params } => {
                ctx.set_params(params);
                ctx.set_matched_route(route.name());
                for stage in route.stages() {
                    pipeline.add_spec(stage.clone());
                }
                pipeline.add(route.controller().clone(), Value::Null);
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                ctx.set(
                    "allowed_methods",
                    Value::Array(allowed.iter().map(|m| json!(m.as_str())).collect()),
                );
                pipeline.add(self.method_not_allowed.clone(), Value::Null);
            }
            RouteMatch::NotFound => {
                pipeline.add(self.not_found.clone(), Value::Null);
            }
        }

        match pipeline.run(&self.registry, &mut ctx) {
            Ok(report) => Ok(DispatchOutcome {
                context: ctx,
                report,
            }),
            Err(err) => {
                if let Some(reporter) = self.error_reporter() {
                    reporter.report(&err);
                }
                warn!(error = %err, "request pipeline failed");
                Err(err.into())
            }
        }
    }

    /// The published runtime settings.
    #[must_use]
    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    /// The populated service registry.
    #[must_use]
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// The globally registered pipeline stages, in execution order.
    #[must_use]
    pub fn global_stages(&self) -> &[StageSpec] {
        &self.global_stages
    }

    /// Strips the base URI and the active locale segment from a request
    /// path, producing the path routes are matched against.
    fn route_path(&self, path: &str) -> String {
        let path = path.split('?').next().unwrap_or(path);
        let relative = path.strip_prefix(self.settings.base_uri()).unwrap_or(path);
        let trimmed = relative.trim_start_matches('/');

        let first = trimmed.split('/').next().unwrap_or("");
        let remainder = if !first.is_empty()
            && first.eq_ignore_ascii_case(&self.settings.locale().code)
        {
            trimmed[first.len()..].trim_start_matches('/')
        } else {
            trimmed
        };

        if remainder.is_empty() {
            "/".to_string()
        } else {
            format!("/{remainder}")
        }
    }

    fn error_reporter(&self) -> Option<Arc<dyn ErrorReporter>> {
        self.registry
            .resolve_as::<Arc<dyn ErrorReporter>>(ERROR_REPORTER_SERVICE)
            .ok()
            .map(|outer| (*outer).clone())
    }

    /// Builds the immutable route table from the `routes` document.
    fn build_router(routes_doc: &ConfigDocument) -> Result<Router, AppError> {
        let mut router = Router::new();
        for (route_name, value) in routes_doc.entries() {
            let spec: RouteSpec =
                serde_json::from_value(value.clone()).map_err(|source| AppError::Route {
                    name: route_name.to_string(),
                    reason: source.to_string(),
                })?;

            let methods = spec
                .methods
                .iter()
                .map(|raw| parse_method(route_name, raw))
                .collect::<Result<Vec<_>, _>>()?;

            let route = router.add_route(
                methods,
                &spec.uri,
                HandlerRef::parse(&spec.controller),
                route_name,
            );
            for (reference, data) in &spec.mw {
                route.stage(HandlerRef::parse(reference), data.clone());
            }
        }
        Ok(router)
    }

    /// Registers the config store, settings, core collaborator services
    /// and the router. Runs before any user-defined registration.
    fn register_core_services(
        registry: &mut ServiceRegistry,
        store: ConfigStore,
        settings: RuntimeSettings,
        router: Router,
    ) {
        registry.register_value(CONFIG_SERVICE, Arc::new(store));
        registry.register_value(SETTINGS_SERVICE, Arc::new(settings));

        registry.register(COOKIE_SERVICE, |r| {
            let store: Arc<ConfigStore> = r.value_as(CONFIG_SERVICE)?;
            let config: CookieConfig = store
                .get_as(&["services", "Cookie"])
                .map_err(|e| RegistryError::factory(COOKIE_SERVICE, e))?;
            let mut cookie = CookieService::new();
            cookie.configure(&config);
            Ok(Arc::new(cookie) as Shared)
        });

        registry.register(SESSION_SERVICE, |r| {
            let store: Arc<ConfigStore> = r.value_as(CONFIG_SERVICE)?;
            let session_config: SessionConfig = store
                .get_as(&["services", "Session"])
                .map_err(|e| RegistryError::factory(SESSION_SERVICE, e))?;
            let cookie_config: CookieConfig = store
                .get_as(&["services", "Cookie"])
                .map_err(|e| RegistryError::factory(SESSION_SERVICE, e))?;
            let mut session = SessionService::new();
            session.configure(&session_config);
            session.configure_cookie(&cookie_config);
            Ok(Arc::new(session) as Shared)
        });

        registry.register(TOKEN_SERVICE, |_| Ok(Arc::new(TokenService::new()) as Shared));

        registry.register(CSRF_SERVICE, |r| {
            let token: Arc<TokenService> = r.resolve_as(TOKEN_SERVICE)?;
            let session: Arc<SessionService> = r.resolve_as(SESSION_SERVICE)?;
            let store: Arc<ConfigStore> = r.value_as(CONFIG_SERVICE)?;
            let config: CsrfConfig = store
                .get_as(&["services", "Csrf"])
                .map_err(|e| RegistryError::factory(CSRF_SERVICE, e))?;
            let mut csrf = CsrfService::new(token, session);
            csrf.configure(&config);
            Ok(Arc::new(csrf) as Shared)
        });

        registry.register_value(ROUTER_SERVICE, Arc::new(router));

        // Fixed fallback terminal stages; user handlers registered under
        // the same names replace them.
        registry.register_handler(
            NOT_FOUND_HANDLER,
            Arc::new(FnHandler::new(
                |ctx: &mut RequestContext, _: &Value| -> Result<Flow, HandlerError> {
                    ctx.set("response", json!("Not Found"));
                    Ok(Flow::Continue)
                },
            )),
        );
        registry.register_handler(
            METHOD_NOT_ALLOWED_HANDLER,
            Arc::new(FnHandler::new(
                |ctx: &mut RequestContext, _: &Value| -> Result<Flow, HandlerError> {
                    ctx.set("response", json!("Method Not Allowed"));
                    Ok(Flow::Continue)
                },
            )),
        );
    }
}

fn parse_method(route_name: &str, raw: &str) -> Result<Method, AppError> {
    raw.to_ascii_uppercase()
        .parse::<Method>()
        .map_err(|_| AppError::Route {
            name: route_name.to_string(),
            reason: format!("invalid method `{raw}`"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Locale;

    fn settings(base_uri: &str, code: &str) -> RuntimeSettings {
        RuntimeSettings::new(
            false,
            base_uri,
            "http",
            "example.com",
            Locale {
                code: code.to_string(),
                timezone: "UTC".to_string(),
                encoding: "utf-8".to_string(),
            },
        )
    }

    fn app_with(settings: RuntimeSettings) -> Application {
        Application {
            registry: ServiceRegistry::new(),
            settings,
            global_stages: Vec::new(),
            not_found: HandlerRef::parse(NOT_FOUND_HANDLER),
            method_not_allowed: HandlerRef::parse(METHOD_NOT_ALLOWED_HANDLER),
        }
    }

    #[test]
    fn route_path_strips_base_uri_and_locale() {
        let app = app_with(settings("/blog", "en"));
        assert_eq!(app.route_path("/blog/en/posts"), "/posts");
        assert_eq!(app.route_path("/blog/EN/posts/7"), "/posts/7");
        assert_eq!(app.route_path("/blog/en"), "/");
        assert_eq!(app.route_path("/blog/posts"), "/posts");
    }

    #[test]
    fn route_path_without_base_uri() {
        let app = app_with(settings("", "cs"));
        assert_eq!(app.route_path("/cs/kontakt"), "/kontakt");
        assert_eq!(app.route_path("/kontakt"), "/kontakt");
        assert_eq!(app.route_path("/"), "/");
    }

    #[test]
    fn route_path_keeps_foreign_locale_segments() {
        let app = app_with(settings("", "en"));
        // "fr" is not the active locale; the segment stays routable.
        assert_eq!(app.route_path("/fr/posts"), "/fr/posts");
    }

    #[test]
    fn route_path_ignores_query_strings() {
        let app = app_with(settings("", "en"));
        assert_eq!(app.route_path("/en/posts?page=2"), "/posts");
    }

    #[test]
    fn parse_method_accepts_any_case() {
        assert_eq!(parse_method("r", "get").unwrap(), Method::GET);
        assert_eq!(parse_method("r", "POST").unwrap(), Method::POST);
    }

    #[test]
    fn parse_method_rejects_garbage() {
        let err = parse_method("contact", "G E T").unwrap_err();
        assert!(matches!(err, AppError::Route { name, .. } if name == "contact"));
    }
}
