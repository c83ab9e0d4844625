pub mod estimator;
pub mod handler;
pub mod models;

pub use estimator::{OnnxRiskModel, RiskEstimator};
pub use handler::create_risk_router;
pub use models::{FEATURE_NAMES, FeatureVector, PredictResponse, RiskAssessment, RiskBand};
