use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::context::ServiceContext;
use crate::handler;

/// Build the axum router with all icon endpoints.
pub fn build_router(ctx: ServiceContext) -> Router {
    Router::new()
        .route("/health", get(handler::health))
        .route("/icons/config", get(handler::icons_config))
        .route(
            "/icons",
            get(handler::list_icons).post(handler::create_icon),
        )
        .route(
            "/icons/:name",
            get(handler::describe_icon).delete(handler::remove_icon),
        )
        .route(
            "/icons/:name/formats/:format/sizes/:size",
            get(handler::get_icon_file)
                .post(handler::add_icon_file)
                .delete(handler::remove_icon_file),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
