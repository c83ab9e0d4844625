use axum::{
    Json, Router,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    routing::{get, post},
};
use std::time::Instant;

use super::models::{TriagePrediction, UploadedFile, XrayClass};
use super::storage::StoredUpload;
use super::{preprocess, sniff};
use crate::error::{ErrorBody, TriageError};
use crate::features::health::handler::{health_check, liveness};
use crate::state::TriageState;

const FILE_FIELD: &str = "file";
const NO_FILE_PART: &str = "No file part";
const NO_SELECTED_FILE: &str = "No selected file";

/// 读取表单失败：超出体积上限单独报告，其余一律视为缺少文件。
fn field_error(e: MultipartError, limit: usize) -> TriageError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(limit, "上传超出体积上限");
        return TriageError::PayloadTooLarge(limit);
    }
    tracing::warn!("读取 multipart 字段失败: {}", e);
    TriageError::MissingFile(NO_FILE_PART)
}

/// 从 multipart 表单中取出 `file` 字段。
///
/// 非 multipart 请求、表单损坏、或不含带文件名的 `file` 字段都视为缺少文件。
async fn read_file_field(
    multipart: Result<Multipart, MultipartRejection>,
    limit: usize,
) -> Result<UploadedFile, TriageError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::warn!("multipart 请求解析失败: {}", e);
        TriageError::MissingFile(NO_FILE_PART)
    })?;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(TriageError::MissingFile(NO_FILE_PART)),
            Err(e) => return Err(field_error(e, limit)),
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        // 没有 filename 参数的同名字段是普通表单值，不是文件
        let Some(declared) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(|e| field_error(e, limit))?;
        return UploadedFile::new(&declared, bytes)
            .ok_or(TriageError::MissingFile(NO_SELECTED_FILE));
    }
}

/// 读回 → 预处理 → 推理；模型状态在预处理之后检查。
async fn classify_stored(
    state: &TriageState,
    stored: &StoredUpload,
) -> Result<(XrayClass, f64), TriageError> {
    let bytes = stored.read_back().await?;

    let _permit = state
        .inference_permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| TriageError::Prediction(format!("获取推理信号量失败: {e}")))?;

    let size = state.image_size;
    let t_pre = Instant::now();
    let tensor = tokio::task::spawn_blocking(move || preprocess::image_to_tensor(&bytes, size))
        .await
        .map_err(|e| TriageError::Prediction(format!("预处理任务异常退出: {e}")))??;
    tracing::debug!(elapsed_ms = t_pre.elapsed().as_millis() as u64, "预处理完成");

    let Some(model) = state.model.ready().cloned() else {
        return Err(TriageError::ModelUnavailable);
    };

    let probs = tokio::task::spawn_blocking(move || model.class_probabilities(tensor))
        .await
        .map_err(|e| TriageError::Prediction(format!("推理任务异常退出: {e}")))??;

    XrayClass::argmax(&probs).map_err(TriageError::Prediction)
}

#[utoipa::path(
    post,
    path = "/upload",
    summary = "X 光影像分诊",
    description = "上传 JPEG/PNG/DICOM 文件（表单字段 file），返回 Benign/Malignant/Normal 中概率最高的类别及其概率。",
    request_body(content = super::models::UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "分类成功", body = TriagePrediction),
        (status = 400, description = "缺少文件、类型不支持或预处理失败", body = ErrorBody),
        (status = 413, description = "超出上传体积上限", body = ErrorBody),
        (status = 500, description = "模型未加载或推理失败", body = ErrorBody)
    ),
    tag = "Triage"
)]
pub async fn upload(
    State(state): State<TriageState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<TriagePrediction>, TriageError> {
    let t_total = Instant::now();

    let file = read_file_field(multipart, state.max_upload_bytes).await?;
    let kind = sniff::detect(&file.bytes).ok_or_else(|| {
        tracing::info!(filename = %file.filename, "上传文件类型不受支持");
        TriageError::UnsupportedFileType
    })?;
    tracing::info!(
        filename = %file.filename,
        kind = kind.as_str(),
        bytes = file.bytes.len(),
        "收到影像上传"
    );

    let stored = state.uploads.persist(&file).await?;
    let outcome = classify_stored(&state, &stored).await;
    stored.release().await;
    let (class, probability) = outcome?;

    tracing::info!(
        prediction = ?class,
        probability,
        elapsed_ms = t_total.elapsed().as_millis() as u64,
        "影像分诊完成"
    );
    Ok(Json(TriagePrediction {
        prediction: class,
        probability,
    }))
}

/// 影像分诊服务路由
pub fn create_triage_router() -> Router<TriageState> {
    Router::new()
        .route("/", get(liveness))
        .route("/health", get(health_check))
        .route("/upload", post(upload))
}
