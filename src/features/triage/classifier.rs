use std::path::Path;

use tract_onnx::prelude::*;

use super::preprocess::CHANNELS;
use crate::error::TriageError;

type RunnablePlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// X 光图像分类器：输入预处理后的张量，输出三类概率（Benign, Malignant, Normal）。
pub trait XrayClassifier: Send + Sync + 'static {
    fn class_probabilities(&self, input: Tensor) -> Result<Vec<f32>, TriageError>;
}

/// 基于 ONNX 图的分类器（由 Keras 模型导出，NHWC 输入）
pub struct OnnxXrayClassifier {
    plan: RunnablePlan,
}

impl OnnxXrayClassifier {
    pub fn load(path: &Path, image_size: u32) -> TractResult<Self> {
        let side = image_size as usize;
        let plan = tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, side, side, CHANNELS)),
            )?
            .into_optimized()?
            .into_runnable()?;
        Ok(Self { plan })
    }
}

impl XrayClassifier for OnnxXrayClassifier {
    fn class_probabilities(&self, input: Tensor) -> Result<Vec<f32>, TriageError> {
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| TriageError::Prediction(format!("模型推理失败: {e}")))?;
        let first = outputs
            .first()
            .ok_or_else(|| TriageError::Prediction("模型没有输出".to_string()))?;
        let view = first
            .to_array_view::<f32>()
            .map_err(|e| TriageError::Prediction(format!("模型输出类型异常: {e}")))?;
        Ok(view.iter().copied().collect())
    }
}
