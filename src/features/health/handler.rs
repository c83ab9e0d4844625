use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;

/// 存活探针文本
pub const LIVENESS_TEXT: &str = "Backend is running!";

/// 健康检查所需的服务信息，由各服务状态通过 `FromRef` 派生
#[derive(Debug, Clone)]
pub struct HealthProbe {
    pub service: &'static str,
    pub model_ready: bool,
}

/// 健康检查响应
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    /// 服务状态
    #[schema(example = "healthy")]
    pub status: String,
    /// 服务名称
    #[schema(example = "lung-risk")]
    pub service: String,
    /// 当前版本（Cargo package version）
    #[schema(example = "0.1.0")]
    pub version: String,
    /// 模型状态：ready / failed
    #[schema(example = "ready")]
    pub model: String,
}

#[utoipa::path(
    get,
    path = "/",
    summary = "存活探针",
    responses((status = 200, description = "服务进程存活", body = String, content_type = "text/plain")),
    tag = "Health"
)]
pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// 模型加载失败时仍返回 200：进程可服务，只是推理请求会被拒绝。
#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "返回服务状态、版本信息与模型加载状态。",
    responses((status = 200, description = "服务健康", body = HealthResponse)),
    tag = "Health"
)]
pub async fn health_check(State(probe): State<HealthProbe>) -> (StatusCode, Json<HealthResponse>) {
    let status = if probe.model_ready { "healthy" } else { "degraded" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            service: probe.service.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            model: if probe.model_ready { "ready" } else { "failed" }.to_string(),
        }),
    )
}
