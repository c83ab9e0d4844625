use utoipa::OpenApi;

/// 风险评估服务的 OpenAPI 文档
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::liveness,
        crate::features::health::handler::health_check,
        crate::features::risk::handler::predict,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::features::health::handler::HealthResponse,
        crate::features::risk::models::PredictResponse,
        crate::features::risk::models::FeatureRecordDoc,
    )),
    tags(
        (name = "Risk", description = "Lung cancer risk APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "Lung Risk API",
        version = "0.1.0",
        description = "Tabular lung-cancer risk estimation (Axum)"
    )
)]
pub struct RiskApiDoc;

/// 影像分诊服务的 OpenAPI 文档
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::liveness,
        crate::features::health::handler::health_check,
        crate::features::triage::handler::upload,
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::features::health::handler::HealthResponse,
        crate::features::triage::models::TriagePrediction,
        crate::features::triage::models::XrayClass,
        crate::features::triage::models::UploadForm,
    )),
    tags(
        (name = "Triage", description = "X-ray triage APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "X-ray Triage API",
        version = "0.1.0",
        description = "Chest X-ray image classification (Axum)"
    )
)]
pub struct TriageApiDoc;
