use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置加载错误
    #[error("配置错误: {0}")]
    Config(String),

    /// I/O 错误（启动期目录创建、监听端口等）
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),

    /// 风险评估服务错误
    #[error(transparent)]
    Risk(#[from] RiskError),

    /// 影像分诊服务错误
    #[error(transparent)]
    Triage(#[from] TriageError),
}

/// 风险评估（表格模型）错误类型
///
/// 对外消息保留完整细节，调用方可直接据此修正请求。
#[derive(Error, Debug)]
pub enum RiskError {
    /// 启动时模型加载失败
    #[error("Model is not loaded correctly.")]
    ModelUnavailable,

    /// 请求体无法解析为 JSON 对象
    #[error("Error parsing JSON: {0}")]
    MalformedInput(String),

    /// 缺少必需特征（列出全部缺失项）
    #[error("Missing feature(s): {}", .0.join(", "))]
    MissingFeature(Vec<&'static str>),

    /// 推理过程失败
    #[error("Error making prediction: {0}")]
    Inference(String),
}

/// 影像分诊（图像模型）错误类型
///
/// Display 携带内部细节用于日志；对外消息见 [`TriageError::public_message`]。
#[derive(Error, Debug)]
pub enum TriageError {
    /// 缺少文件字段或文件名为空
    #[error("{0}")]
    MissingFile(&'static str),

    /// 请求体超过上传体积上限
    #[error("File too large. Maximum upload size is {0} bytes.")]
    PayloadTooLarge(usize),

    /// 既不是 JPEG/PNG 也不是 DICOM
    #[error("Invalid file type. Please upload a valid X-ray image (JPEG, PNG, or DICOM).")]
    UnsupportedFileType,

    /// 解码或缩放失败
    #[error("Image preprocessing failed: {0}")]
    Preprocessing(String),

    /// 启动时模型加载失败
    #[error("Model is not loaded")]
    ModelUnavailable,

    /// 其余流水线错误
    #[error("Error during prediction: {0}")]
    Prediction(String),
}

impl TriageError {
    /// 对外返回的消息（内部细节不透出）
    pub fn public_message(&self) -> String {
        match self {
            TriageError::Preprocessing(_) => "Image preprocessing failed".to_string(),
            TriageError::Prediction(_) => "Error during prediction".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for TriageError {
    fn from(err: std::io::Error) -> Self {
        TriageError::Prediction(format!("I/O 错误: {err}"))
    }
}

/// 错误响应体：`{"error": "<message>"}`
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// 人类可读的错误信息
    #[schema(example = "Missing feature(s): CHEST_PAIN")]
    pub error: String,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Risk(e) => match e {
                RiskError::MalformedInput(_) | RiskError::MissingFeature(_) => {
                    StatusCode::BAD_REQUEST
                }
                RiskError::ModelUnavailable | RiskError::Inference(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Triage(e) => match e {
                TriageError::MissingFile(_)
                | TriageError::UnsupportedFileType
                | TriageError::Preprocessing(_) => StatusCode::BAD_REQUEST,
                TriageError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                TriageError::ModelUnavailable | TriageError::Prediction(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Risk(e) => e.to_string(),
            AppError::Triage(e) => e.public_message(),
            // 启动期/内部错误不向调用方暴露细节
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let request_id = crate::request_id::current_request_id();
        if status.is_server_error() {
            tracing::error!(request_id = ?request_id, status = status.as_u16(), "{}", self);
        } else {
            tracing::warn!(request_id = ?request_id, status = status.as_u16(), "{}", self);
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for RiskError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

impl IntoResponse for TriageError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppError, RiskError, TriageError};
    use axum::{http::StatusCode, response::IntoResponse};

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("parse json")
    }

    #[test]
    fn missing_feature_lists_every_key_in_order() {
        let err = RiskError::MissingFeature(vec!["FATIGUE", "CHEST_PAIN"]);
        assert_eq!(err.to_string(), "Missing feature(s): FATIGUE, CHEST_PAIN");
    }

    #[tokio::test]
    async fn triage_prediction_error_hides_detail() {
        let resp = TriageError::Prediction("tract: shape mismatch".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v = body_json(resp).await;
        assert_eq!(v["error"], "Error during prediction");
    }

    #[tokio::test]
    async fn triage_preprocessing_error_is_bad_request() {
        let resp = TriageError::Preprocessing("corrupt deflate stream".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["error"], "Image preprocessing failed");
    }

    #[tokio::test]
    async fn internal_error_is_opaque() {
        let resp = AppError::Internal("semaphore closed".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let v = body_json(resp).await;
        assert_eq!(v["error"], "Internal server error");
    }
}
