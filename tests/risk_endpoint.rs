use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use lungcare_backend::config::CorsConfig;
use lungcare_backend::features::risk::{FEATURE_NAMES, FeatureVector, RiskEstimator};
use lungcare_backend::state::RiskState;
use lungcare_backend::{ModelState, RiskError, app};

/// 固定输出的估计器，并记录最近一次收到的特征
struct FixedEstimator {
    probability: f64,
    seen: Mutex<Option<Vec<f32>>>,
}

impl RiskEstimator for FixedEstimator {
    fn positive_probability(&self, features: &FeatureVector) -> Result<f64, RiskError> {
        if let Ok(mut seen) = self.seen.lock() {
            *seen = Some(features.as_slice().to_vec());
        }
        Ok(self.probability)
    }
}

fn state_with(model: ModelState<dyn RiskEstimator>) -> RiskState {
    RiskState {
        model,
        threshold: 0.5,
        inference_permits: Arc::new(Semaphore::new(2)),
    }
}

fn build_app(probability: f64) -> (Router, Arc<FixedEstimator>) {
    let estimator = Arc::new(FixedEstimator {
        probability,
        seen: Mutex::new(None),
    });
    let model = ModelState::Loaded(estimator.clone() as Arc<dyn RiskEstimator>);
    (app::build_risk_app(state_with(model), &CorsConfig::default()), estimator)
}

fn full_record() -> Value {
    let mut record = serde_json::Map::new();
    for (i, name) in FEATURE_NAMES.iter().enumerate() {
        record.insert(name.to_string(), json!(i % 2));
    }
    Value::Object(record)
}

async fn post_predict(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .expect("request /predict");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("parse json"))
}

#[tokio::test]
async fn high_probability_reports_high_risk() {
    let (app, _) = build_app(0.73);
    let (status, json) = post_predict(app, full_record().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["prediction"],
        "High risk: 73.00%. Please consult with a doctor immediately"
    );
}

#[tokio::test]
async fn threshold_boundary_counts_as_high_risk() {
    let (app, _) = build_app(0.5);
    let (status, json) = post_predict(app, full_record().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json["prediction"],
        "High risk: 50.00%. Please consult with a doctor immediately"
    );
}

#[tokio::test]
async fn low_probability_reports_low_risk() {
    let (app, _) = build_app(0.2);
    let (status, json) = post_predict(app, full_record().to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["prediction"], "Low risk: 20.00%");
}

#[tokio::test]
async fn features_reach_the_model_in_fixed_order() {
    let (app, estimator) = build_app(0.1);
    // 打乱键的书写顺序，并混入布尔值与多余字段
    let body = json!({
        "ANXYELFIN": true,
        "CHEST_PAIN": 0,
        "SWALLOWING_DIFFICULTY": 1,
        "COUGHING": false,
        "ALCOHOL_CONSUMING": 1,
        "WHEEZING": 0,
        "ALLERGY": 1,
        "FATIGUE": 0,
        "CHRONIC_DISEASE": 1,
        "PEER_PRESSURE": 0,
        "ANXIETY": 1,
        "YELLOW_FINGERS": 0,
        "AGE": 64
    });
    let (status, _) = post_predict(app, body.to_string()).await;
    assert_eq!(status, StatusCode::OK);

    let seen = estimator.seen.lock().unwrap().clone().expect("model was called");
    assert_eq!(
        seen,
        vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0]
    );
}

#[tokio::test]
async fn missing_feature_is_reported_by_name() {
    let (app, estimator) = build_app(0.9);
    let mut record = full_record();
    record.as_object_mut().unwrap().remove("CHEST_PAIN");

    let (status, json) = post_predict(app, record.to_string()).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Missing feature(s): CHEST_PAIN");
    assert!(estimator.seen.lock().unwrap().is_none());
}

#[tokio::test]
async fn every_missing_feature_is_listed_in_column_order() {
    let (app, _) = build_app(0.9);
    let (status, json) = post_predict(
        app,
        json!({"YELLOW_FINGERS": 1, "ANXIETY": 0, "PEER_PRESSURE": 1, "CHRONIC_DISEASE": 0,
               "ALLERGY": 1, "WHEEZING": 0, "ALCOHOL_CONSUMING": 1, "COUGHING": 0,
               "SWALLOWING_DIFFICULTY": 1})
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Missing feature(s): FATIGUE, CHEST_PAIN, ANXYELFIN"
    );
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (app, _) = build_app(0.9);
    let (status, json) = post_predict(app, "{\"YELLOW_FINGERS\": ").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap_or_default()
            .starts_with("Error parsing JSON"),
        "unexpected error: {json}"
    );
}

#[tokio::test]
async fn non_object_json_is_rejected() {
    let (app, _) = build_app(0.9);
    let (status, json) = post_predict(app, "[1, 0, 1]").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(
        json["error"]
            .as_str()
            .unwrap_or_default()
            .starts_with("Error parsing JSON")
    );
}

#[tokio::test]
async fn non_numeric_value_fails_prediction() {
    let (app, _) = build_app(0.9);
    let mut record = full_record();
    record["FATIGUE"] = json!("yes");

    let (status, json) = post_predict(app, record.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        json["error"]
            .as_str()
            .unwrap_or_default()
            .starts_with("Error making prediction")
    );
}

#[tokio::test]
async fn failed_model_rejects_every_prediction() {
    let app = app::build_risk_app(
        state_with(ModelState::Failed("missing artifact".into())),
        &CorsConfig::default(),
    );
    let (status, json) = post_predict(app, full_record().to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "Model is not loaded correctly.");
}

#[tokio::test]
async fn liveness_returns_plain_text() {
    let (app, _) = build_app(0.1);
    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .expect("request /");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    assert_eq!(&body[..], b"Backend is running!");
}

#[tokio::test]
async fn health_reflects_model_state() {
    let app = app::build_risk_app(
        state_with(ModelState::Failed("missing artifact".into())),
        &CorsConfig::default(),
    );
    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let body = to_bytes(resp.into_body(), usize::MAX).await.expect("read body");
    let json: Value = serde_json::from_slice(&body).expect("parse json");
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["service"], "lung-risk");
    assert_eq!(json["model"], "failed");
}
