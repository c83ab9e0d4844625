use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RiskError;

/// 特征数量
pub const FEATURE_COUNT: usize = 12;

/// 必需特征，顺序即送入模型的列顺序
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "YELLOW_FINGERS",
    "ANXIETY",
    "PEER_PRESSURE",
    "CHRONIC_DISEASE",
    "FATIGUE",
    "ALLERGY",
    "WHEEZING",
    "ALCOHOL_CONSUMING",
    "COUGHING",
    "SWALLOWING_DIFFICULTY",
    "CHEST_PAIN",
    "ANXYELFIN",
];

/// 按固定顺序排列的特征向量
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f32; FEATURE_COUNT]);

impl FeatureVector {
    /// 从请求中的 JSON 对象组装特征向量。
    ///
    /// 先整体检查缺失项（一次性列出全部缺失键），再做类型转换；
    /// 多余的键会被忽略。布尔值按 1/0 处理，非数值类型视为推理错误。
    pub fn from_record(record: &Map<String, Value>) -> Result<Self, RiskError> {
        let missing: Vec<&'static str> = FEATURE_NAMES
            .iter()
            .copied()
            .filter(|name| !record.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            return Err(RiskError::MissingFeature(missing));
        }

        let mut values = [0f32; FEATURE_COUNT];
        for (slot, name) in values.iter_mut().zip(FEATURE_NAMES) {
            *slot = match &record[name] {
                Value::Bool(b) => f32::from(u8::from(*b)),
                Value::Number(n) => n.as_f64().map(|v| v as f32).ok_or_else(|| {
                    RiskError::Inference(format!("feature {name} is not a finite number"))
                })?,
                other => {
                    return Err(RiskError::Inference(format!(
                        "feature {name} must be a number or boolean, got {other}"
                    )));
                }
            };
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<[f32; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f32; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// 风险分档
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskBand {
    High,
    Low,
}

/// 一次风险评估的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    /// 正类（高风险）概率
    pub probability: f64,
    pub band: RiskBand,
}

impl RiskAssessment {
    /// 按阈值分档：概率 >= 阈值即为高风险（边界值归入高风险）。
    pub fn classify(probability: f64, threshold: f64) -> Self {
        let band = if probability >= threshold {
            RiskBand::High
        } else {
            RiskBand::Low
        };
        Self { probability, band }
    }

    /// 面向用户的结论文本，百分比保留两位小数
    pub fn describe(&self) -> String {
        let percentage = self.probability * 100.0;
        match self.band {
            RiskBand::High => format!(
                "High risk: {percentage:.2}%. Please consult with a doctor immediately"
            ),
            RiskBand::Low => format!("Low risk: {percentage:.2}%"),
        }
    }
}

/// `/predict` 成功响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PredictResponse {
    #[schema(example = "High risk: 73.00%. Please consult with a doctor immediately")]
    pub prediction: String,
}

/// `/predict` 请求体（仅用于文档；实际按任意 JSON 对象解析以便报告缺失项）
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(dead_code)]
pub struct FeatureRecordDoc {
    yellow_fingers: u8,
    anxiety: u8,
    peer_pressure: u8,
    chronic_disease: u8,
    fatigue: u8,
    allergy: u8,
    wheezing: u8,
    alcohol_consuming: u8,
    coughing: u8,
    swallowing_difficulty: u8,
    chest_pain: u8,
    anxyelfin: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_record() -> Map<String, Value> {
        let mut m = Map::new();
        for (i, name) in FEATURE_NAMES.iter().enumerate() {
            m.insert((*name).to_string(), json!(i % 2));
        }
        m
    }

    #[test]
    fn features_follow_declared_order() {
        let mut record = full_record();
        record.insert("ANXYELFIN".into(), json!(true));
        record.insert("UNUSED_EXTRA".into(), json!("ignored"));
        let v = FeatureVector::from_record(&record).expect("valid record");
        assert_eq!(v.as_slice()[0], 0.0);
        assert_eq!(v.as_slice()[1], 1.0);
        assert_eq!(v.as_slice()[11], 1.0);
    }

    #[test]
    fn reports_all_missing_keys() {
        let mut record = full_record();
        record.remove("ANXIETY");
        record.remove("CHEST_PAIN");
        match FeatureVector::from_record(&record) {
            Err(RiskError::MissingFeature(keys)) => assert_eq!(keys, vec!["ANXIETY", "CHEST_PAIN"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn non_numeric_value_is_inference_error() {
        let mut record = full_record();
        record.insert("FATIGUE".into(), json!("yes"));
        assert!(matches!(
            FeatureVector::from_record(&record),
            Err(RiskError::Inference(_))
        ));
    }

    #[test]
    fn boundary_probability_is_high_risk() {
        let a = RiskAssessment::classify(0.5, 0.5);
        assert_eq!(a.band, RiskBand::High);
        assert_eq!(
            a.describe(),
            "High risk: 50.00%. Please consult with a doctor immediately"
        );
    }

    #[test]
    fn low_risk_text_has_two_decimals() {
        let a = RiskAssessment::classify(0.12345, 0.5);
        assert_eq!(a.band, RiskBand::Low);
        assert_eq!(a.describe(), "Low risk: 12.35%");
    }
}
