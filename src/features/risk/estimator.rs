use std::path::Path;

use tract_onnx::prelude::*;

use super::models::{FEATURE_COUNT, FeatureVector};
use crate::error::RiskError;

type RunnablePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// 风险概率估计器：输入固定顺序的特征向量，输出正类概率。
pub trait RiskEstimator: Send + Sync + 'static {
    fn positive_probability(&self, features: &FeatureVector) -> Result<f64, RiskError>;
}

/// 基于 ONNX 图的分类器。
///
/// 兼容两种导出形式：
/// - 多输出（label + probabilities）：取最后一个输出作为概率张量；
/// - 概率张量为 `[1, 2]` 时取下标 1，为 `[1, 1]` 时直接视为正类概率。
///
/// sklearn 模型导出时需关闭 ZipMap，否则概率输出为 map 序列而非张量。
pub struct OnnxRiskModel {
    plan: RunnablePlan,
}

impl OnnxRiskModel {
    pub fn load(path: &Path) -> TractResult<Self> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, FEATURE_COUNT)),
            )?
            .into_optimized()?
            .into_runnable()?;
        Ok(Self { plan })
    }

    fn run(&self, features: &FeatureVector) -> TractResult<Vec<f32>> {
        let input = Tensor::from_shape(&[1, FEATURE_COUNT], features.as_slice())?;
        let outputs = self.plan.run(tvec!(input.into()))?;
        let probs = outputs
            .last()
            .ok_or_else(|| TractError::msg("模型没有输出"))?;
        Ok(probs.to_array_view::<f32>()?.iter().copied().collect())
    }
}

impl RiskEstimator for OnnxRiskModel {
    fn positive_probability(&self, features: &FeatureVector) -> Result<f64, RiskError> {
        let values = self
            .run(features)
            .map_err(|e| RiskError::Inference(e.to_string()))?;
        positive_class_probability(&values)
    }
}

/// 从概率张量中取出正类概率并校验取值范围。
pub fn positive_class_probability(values: &[f32]) -> Result<f64, RiskError> {
    let p = match values {
        [p] => *p,
        [_, p] => *p,
        other => {
            return Err(RiskError::Inference(format!(
                "unexpected probability output of length {}",
                other.len()
            )));
        }
    };
    let p = f64::from(p);
    if !(0.0..=1.0).contains(&p) {
        return Err(RiskError::Inference(format!(
            "probability {p} is outside [0, 1]"
        )));
    }
    Ok(p)
}
