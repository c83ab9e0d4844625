use image::imageops::FilterType;
use tract_onnx::prelude::*;
use tract_onnx::prelude::tract_ndarray::Array4;

use crate::error::TriageError;

/// 颜色通道数（模型按 RGB 训练）
pub const CHANNELS: usize = 3;

/// 解码图片并转换为模型输入张量 `[1, size, size, 3]`（NHWC），像素值缩放到 [0, 1]。
pub fn image_to_tensor(bytes: &[u8], size: u32) -> Result<Tensor, TriageError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| TriageError::Preprocessing(format!("图片解码失败: {e}")))?;
    if size == 0 {
        return Err(TriageError::Preprocessing("目标尺寸不能为 0".to_string()));
    }

    let rgb = decoded
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();
    let side = size as usize;
    let array = Array4::from_shape_fn((1, side, side, CHANNELS), |(_, y, x, c)| {
        f32::from(rgb.get_pixel(x as u32, y as u32)[c]) / 255.0
    });
    Ok(Tensor::from(array))
}
