//! Router builder for the shelf HTTP server

use axum::{http::StatusCode, routing::get, Json, Router};
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use utoipa::OpenApi;

use shelf_kernel::ModuleRegistry;

use crate::MakeRequestUuid;

/// Version segment every module is mounted under
pub const API_PREFIX: &str = "/api/v1";

/// Base OpenAPI document; module fragments are nested into it
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shelf Library API",
        version = "1.0.0",
        description = "RESTful API for managing a book library: create, read, update, delete and search books."
    ),
    paths(crate::health_check),
    components(schemas(crate::error::ErrorEnvelope, crate::error::ErrorBody))
)]
struct ApiDoc;

/// Builder for constructing the main HTTP router.
///
/// Middleware toggles are recorded and applied in [`RouterBuilder::build`], so
/// they wrap every route regardless of call order.
pub struct RouterBuilder {
    router: Router,
    tracing: bool,
    cors: bool,
    request_id: bool,
    timeout: Option<Duration>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            tracing: false,
            cors: false,
            request_id: false,
            timeout: None,
        }
    }

    pub fn route(mut self, path: &str, route: axum::routing::MethodRouter) -> Self {
        self.router = self.router.route(path, route);
        self
    }

    /// Mount a module's router under `/api/v1/{module_name}`
    pub fn mount_module(mut self, module_name: &str, module_router: Router) -> Self {
        let api_path = module_path(module_name);
        self.router = self.router.nest(&api_path, module_router);
        self
    }

    pub fn with_tracing(mut self) -> Self {
        self.tracing = true;
        self
    }

    pub fn with_cors(mut self) -> Self {
        self.cors = true;
        self
    }

    /// Tag each request with an `x-request-id` and echo it on the response
    pub fn with_request_id(mut self) -> Self {
        self.request_id = true;
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout = Some(Duration::from_millis(timeout_ms));
        self
    }

    /// Serve the merged OpenAPI document and Swagger UI
    pub fn with_openapi(mut self, registry: &ModuleRegistry) -> Self {
        let openapi = merged_openapi(registry);

        self.router = self.router.merge(
            utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi.clone()),
        );

        // Raw document for external consumers
        self.router = self.router.route(
            "/docs/openapi.json",
            get(move || async move { Json(openapi.clone()) }),
        );

        self
    }

    pub fn build(self) -> Router {
        let mut router = self.router;

        if let Some(timeout) = self.timeout {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }
        if self.cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }
        if self.tracing {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().include_headers(true))
                    .on_request(DefaultOnRequest::new().level(tracing::Level::INFO))
                    .on_response(DefaultOnResponse::new().level(tracing::Level::INFO)),
            );
        }
        if self.request_id {
            // Outermost, so the trace span already sees the id.
            router = router
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));
        }

        router
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn module_path(module_name: &str) -> String {
    format!("{}/{}", API_PREFIX, module_name)
}

/// Nest every module's OpenAPI fragment under its mount path
pub fn merged_openapi(registry: &ModuleRegistry) -> utoipa::openapi::OpenApi {
    let mut openapi = ApiDoc::openapi();

    for module in registry.modules() {
        if let Some(fragment) = module.openapi() {
            openapi =
                openapi.nest_with_path_composer(module_path(module.name()), fragment, |base, path| {
                    if path == "/" {
                        base.to_string()
                    } else {
                        format!("{base}{path}")
                    }
                });
        }
    }

    openapi
}
