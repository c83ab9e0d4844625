use axum::extract::FromRef;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::features::health::handler::HealthProbe;
use crate::features::risk::estimator::RiskEstimator;
use crate::features::triage::classifier::XrayClassifier;
use crate::features::triage::storage::UploadStore;
use crate::model::ModelState;

/// 风险评估服务的共享状态
#[derive(Clone)]
pub struct RiskState {
    /// 启动时加载的估计器
    pub model: ModelState<dyn RiskEstimator>,
    /// 高风险判定阈值
    pub threshold: f64,
    /// 控制并发推理的信号量（限制 CPU 密集型任务数量）
    pub inference_permits: Arc<Semaphore>,
}

/// 影像分诊服务的共享状态
#[derive(Clone)]
pub struct TriageState {
    /// 启动时加载的图像分类器
    pub model: ModelState<dyn XrayClassifier>,
    /// 上传文件工作目录
    pub uploads: Arc<UploadStore>,
    /// 模型输入边长（像素）
    pub image_size: u32,
    /// 单次上传体积上限（字节），与路由上的 `DefaultBodyLimit` 一致
    pub max_upload_bytes: usize,
    /// 控制并发推理的信号量（解码与推理共用）
    pub inference_permits: Arc<Semaphore>,
}

impl FromRef<RiskState> for HealthProbe {
    fn from_ref(state: &RiskState) -> Self {
        HealthProbe {
            service: "lung-risk",
            model_ready: state.model.is_ready(),
        }
    }
}

impl FromRef<TriageState> for HealthProbe {
    fn from_ref(state: &TriageState) -> Self {
        HealthProbe {
            service: "xray-triage",
            model_ready: state.model.is_ready(),
        }
    }
}
