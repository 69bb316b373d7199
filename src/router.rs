use axum::{
    Router,
    error_handling::HandleErrorLayer,
    routing::{get, post},
};
use tower::ServiceBuilder;

use crate::{
    AppState,
    api::handlers,
    middleware::{handle_timeout, log_errors, rate_limit},
};

// 用户相关的路由，全部经过限流
fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/user", post(handlers::create_user))
        .route(
            "/user/{id}",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        .route("/users", get(handlers::list_users))
        .route_layer(axum::middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit,
        ))
}

/// 组装完整的应用路由
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .merge(user_routes(&state))
        .route("/ping", get(handlers::ping))
        .layer(axum::middleware::from_fn(log_errors))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_timeout))
                .timeout(state.config.request_timeout()),
        );

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
