use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use serde_json::{Map, Value};
use std::time::Instant;

use super::models::{FeatureVector, PredictResponse, RiskAssessment};
use crate::error::{ErrorBody, RiskError};
use crate::features::health::handler::{health_check, liveness};
use crate::state::RiskState;

#[utoipa::path(
    post,
    path = "/predict",
    summary = "肺癌风险评估",
    description = "接收 12 项症状特征（0/1 或布尔值），返回按 0.5 阈值分档的风险结论与百分比。",
    request_body = super::models::FeatureRecordDoc,
    responses(
        (status = 200, description = "评估成功", body = PredictResponse),
        (status = 400, description = "JSON 无法解析或缺少特征", body = ErrorBody),
        (status = 500, description = "模型未加载或推理失败", body = ErrorBody)
    ),
    tag = "Risk"
)]
pub async fn predict(
    State(state): State<RiskState>,
    body: Bytes,
) -> Result<Json<PredictResponse>, RiskError> {
    let t_total = Instant::now();

    // 模型不可用时直接拒绝，不解析请求体
    let Some(model) = state.model.ready().cloned() else {
        return Err(RiskError::ModelUnavailable);
    };

    let record: Map<String, Value> =
        serde_json::from_slice(&body).map_err(|e| RiskError::MalformedInput(e.to_string()))?;
    tracing::info!(fields = record.len(), "收到风险评估请求: {}", serde_json::Value::Object(record.clone()));

    let features = FeatureVector::from_record(&record)?;

    let _permit = state
        .inference_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| RiskError::Inference(format!("获取推理信号量失败: {e}")))?;

    let probability =
        tokio::task::spawn_blocking(move || model.positive_probability(&features))
            .await
            .map_err(|e| RiskError::Inference(format!("推理任务异常退出: {e}")))??;

    let assessment = RiskAssessment::classify(probability, state.threshold);
    tracing::info!(
        probability,
        band = ?assessment.band,
        elapsed_ms = t_total.elapsed().as_millis() as u64,
        "风险评估完成"
    );

    Ok(Json(PredictResponse {
        prediction: assessment.describe(),
    }))
}

/// 风险评估服务路由
pub fn create_risk_router() -> Router<RiskState> {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/predict", post(predict))
}
