use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::connect_info::MockConnectInfo;
use axum::{Router, body::Body, http::Request, response::Response};
use common::config::AppConfig;
use common::state::AppState;
use db::test_utils::setup_test_db;
use tower::ServiceExt;
use tower::util::BoxCloneService;

/// Router wired to a fresh in-memory database, plus the state backing it.
///
/// `MockConnectInfo` stands in for the peer address that
/// `into_make_service_with_connect_info` provides in production, so
/// handlers reading the client IP work under `oneshot`.
pub async fn make_test_app() -> (BoxCloneService<Request<Body>, Response, Infallible>, AppState) {
    AppConfig::init_test_defaults();

    let db = setup_test_db().await;
    let app_state = AppState::new(db);

    let router: Router = Router::new()
        .nest("/api", api::routes::routes(app_state.clone()))
        .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 42000))));

    (router.boxed_clone(), app_state)
}
