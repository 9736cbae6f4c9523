//! Main router configuration assembling the admin API endpoints.

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    middleware,
    routing::get,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use super::{
    context::AppState,
    handler_admin_clients::{
        create_client_handler, delete_client_handler, get_client_handler, list_clients_handler,
        update_client_handler,
    },
    handler_admin_dashboard::{audit_handler, csrf_token_handler, stats_handler},
    handler_admin_users::{
        create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
        update_user_handler,
    },
    middleware_csrf::{CSRF_HEADER, require_csrf_token},
};

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route(
            "/clients",
            get(list_clients_handler).post(create_client_handler),
        )
        .route(
            "/clients/{client_id}",
            get(get_client_handler)
                .put(update_client_handler)
                .delete(delete_client_handler),
        )
        .route("/stats", get(stats_handler))
        .route("/audit", get(audit_handler))
        .route("/csrf", get(csrf_token_handler))
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            require_csrf_token,
        ));

    Router::new()
        .nest("/api/admin", admin_routes)
        .layer(cors_layer(ctx.config.cors_allowed_origins.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_origins(origins))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(CSRF_HEADER),
        ])
}

fn parse_origins(origins: &[String]) -> Vec<HeaderValue> {
    origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(origin = %origin, error = ?err, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::inmemory::MemoryAdminStorage;
    use axum::{body::Body, http::Request, http::StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_app_state(app_env: &'static str) -> AppState {
        let config = Config::from_lookup(|name| match name {
            "APP_ENV" => Some(app_env.to_string()),
            "CSRF_AUTH_KEY" => Some("0123456789abcdef0123456789abcdef".to_string()),
            "CORS_ALLOWED_ORIGINS" => Some("http://localhost:3001".to_string()),
            _ => None,
        })
        .unwrap();
        AppState::new(config, Arc::new(MemoryAdminStorage::new())).unwrap()
    }

    #[tokio::test]
    async fn test_router_creation() {
        let app_state = create_test_app_state("production");
        let _router = build_router(app_state);
    }

    #[tokio::test]
    async fn test_mutation_without_token_is_forbidden() {
        let router = build_router(create_test_app_state("production"));

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/admin/clients/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_development_skips_token_check() {
        let router = build_router(create_test_app_state("development"));

        let response = router
            .oneshot(
                Request::builder()
                    .method(Method::DELETE)
                    .uri("/api/admin/clients/anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let router = build_router(create_test_app_state("production"));

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/admin/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
