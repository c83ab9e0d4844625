/// 探活与健康检查
pub mod health;
/// 肺癌风险评估（表格模型）
pub mod risk;
/// X 光影像分诊（图像模型）
pub mod triage;
