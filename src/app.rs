//! 路由与中间件装配
//!
//! 两个服务各自拥有独立的 Router 与状态，公共中间件（request_id、访问日志、CORS）
//! 在这里统一叠加。集成测试直接复用这里的构建函数。

use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::cors::build_cors_layer;
use crate::features::risk::create_risk_router;
use crate::features::triage::create_triage_router;
use crate::openapi::{RiskApiDoc, TriageApiDoc};
use crate::request_id::request_id_middleware;
use crate::state::{RiskState, TriageState};

fn with_common_layers(mut app: Router, cors: &CorsConfig) -> Router {
    if let Some(layer) = build_cors_layer(cors) {
        app = app.layer(layer);
    }
    app.layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(request_id_middleware))
}

/// 构建风险评估服务
pub fn build_risk_app(state: RiskState, cors: &CorsConfig) -> Router {
    let app = Router::<RiskState>::new()
        .merge(create_risk_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", RiskApiDoc::openapi()))
        .with_state(state);
    with_common_layers(app, cors)
}

/// 构建影像分诊服务；上传体积上限取自状态中的 `max_upload_bytes`
pub fn build_triage_app(state: TriageState, cors: &CorsConfig) -> Router {
    let limit = state.max_upload_bytes;
    let app = Router::<TriageState>::new()
        .merge(create_triage_router())
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", TriageApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(limit))
        .with_state(state);
    with_common_layers(app, cors)
}
