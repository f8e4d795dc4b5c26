use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::handlers::{protected, public};
use crate::middleware::{auth_rate_limit_middleware, session_auth_middleware};
use crate::state::AppState;

/// Build the full application router.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes(&state))
        // Session required
        .merge(auth_routes(&state))
        .merge(wardrobe_routes(&state))
        .with_state(state)
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
                .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes)),
        );

    if config.security.enable_cors {
        router = router.layer(cors_layer(config));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn auth_public_routes(state: &AppState) -> Router<AppState> {
    use public::auth;

    let limited = Router::new()
        .route("/api/auth/register", post(auth::register_post))
        .route("/api/auth/login", post(auth::login_post))
        .route("/api/auth/reset-password", post(auth::reset_password_post))
        .route_layer(from_fn_with_state(state.clone(), auth_rate_limit_middleware));

    Router::new()
        .route("/api/auth/check-username", get(auth::check_username_get))
        .merge(limited)
}

fn auth_routes(state: &AppState) -> Router<AppState> {
    use protected::auth;

    Router::new()
        .route("/api/auth/logout", post(auth::logout_post))
        .route("/api/auth/me", get(auth::me_get).put(auth::me_put))
        .route("/api/auth/change-password", post(auth::change_password_post))
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware))
}

fn wardrobe_routes(state: &AppState) -> Router<AppState> {
    use protected::wardrobe;

    Router::new()
        .route("/api/clothes", get(wardrobe::clothes_get).post(wardrobe::clothes_post))
        .route(
            "/api/clothes/:id",
            put(wardrobe::clothes_put).delete(wardrobe::clothes_delete),
        )
        .route("/api/outfits", get(wardrobe::outfits_get).post(wardrobe::outfits_post))
        .route(
            "/api/outfits/:id",
            put(wardrobe::outfits_put).delete(wardrobe::outfits_delete),
        )
        .route_layer(from_fn_with_state(state.clone(), session_auth_middleware))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.allows_any_origin() {
        // Reflects the request origin, so credentialed requests work too
        return CorsLayer::very_permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-auth-token"),
        ])
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "Wardrobe API",
        "version": env!("CARGO_PKG_VERSION"),
        "message": "API is running",
        "endpoints": {
            "auth": "/api/auth/register, /api/auth/login, /api/auth/check-username, /api/auth/reset-password (public)",
            "account": "/api/auth/me, /api/auth/logout, /api/auth/change-password (session)",
            "clothes": "/api/clothes[/:id] (session)",
            "outfits": "/api/outfits[/:id] (session)",
        }
    }))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let database = if !state.database.is_configured() {
        "not configured"
    } else if state.database.health_check().await.is_ok() {
        "ok"
    } else {
        "unavailable"
    };

    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "backend": state.active_backend(),
        "database": database,
    }))
}
