use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::risk::{OnnxRiskModel, RiskEstimator};
use crate::features::triage::{OnnxXrayClassifier, UploadStore, XrayClassifier};
use crate::model::ModelState;
use crate::state::{RiskState, TriageState};

/// 加载风险评估模型；失败不会中断启动，服务以降级状态运行。
pub fn load_risk_model(config: &AppConfig) -> ModelState<dyn RiskEstimator> {
    ModelState::load_with("risk", Path::new(&config.risk.model_path), OnnxRiskModel::load)
        .map(|m| m as Arc<dyn RiskEstimator>)
}

/// 加载影像分类模型；失败不会中断启动，服务以降级状态运行。
pub fn load_triage_model(config: &AppConfig) -> ModelState<dyn XrayClassifier> {
    let size = config.triage.image_size;
    ModelState::load_with("triage", Path::new(&config.triage.model_path), |p| {
        OnnxXrayClassifier::load(p, size)
    })
    .map(|m| m as Arc<dyn XrayClassifier>)
}

/// 组装风险评估服务状态
pub fn build_risk_state(config: &AppConfig, permits: Arc<Semaphore>) -> RiskState {
    RiskState {
        model: load_risk_model(config),
        threshold: config.risk.threshold,
        inference_permits: permits,
    }
}

/// 组装影像分诊服务状态，并确保上传目录存在
pub async fn build_triage_state(
    config: &AppConfig,
    permits: Arc<Semaphore>,
) -> Result<TriageState, AppError> {
    let uploads = UploadStore::from_config(&config.triage);
    if !uploads.dir().exists() {
        tracing::warn!("📁 未找到上传目录，正在创建: {:?}", uploads.dir());
    }
    uploads
        .ensure_dir()
        .await
        .map_err(|e| AppError::Internal(format!("创建上传目录失败: {e}")))?;
    tracing::info!(
        dir = ?uploads.dir(),
        retention = ?config.triage.retention,
        naming = ?config.triage.naming,
        "上传目录就绪"
    );

    Ok(TriageState {
        model: load_triage_model(config),
        uploads: Arc::new(uploads),
        image_size: config.triage.image_size,
        max_upload_bytes: config.triage.max_upload_bytes,
        inference_permits: permits,
    })
}
