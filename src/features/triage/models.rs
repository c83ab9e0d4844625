use axum::body::Bytes;
use serde::{Deserialize, Serialize};

/// 分类结果，顺序与模型输出列一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum XrayClass {
    Benign,
    Malignant,
    Normal,
}

impl XrayClass {
    pub const ALL: [XrayClass; 3] = [XrayClass::Benign, XrayClass::Malignant, XrayClass::Normal];

    /// 取概率最大的类别（并列时取靠前者）。
    ///
    /// 概率向量长度必须为 3，且每一项都在 [0, 1] 之间。
    pub fn argmax(probs: &[f32]) -> Result<(XrayClass, f64), String> {
        if probs.len() != Self::ALL.len() {
            return Err(format!(
                "expected {} class probabilities, got {}",
                Self::ALL.len(),
                probs.len()
            ));
        }
        if let Some(bad) = probs.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(format!("class probability {bad} is outside [0, 1]"));
        }

        let mut best = 0;
        for (i, p) in probs.iter().enumerate().skip(1) {
            if *p > probs[best] {
                best = i;
            }
        }
        Ok((Self::ALL[best], f64::from(probs[best])))
    }
}

/// 上传的文件：客户端声明的文件名 + 内容
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// 去除路径成分后的文件名
    pub filename: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    /// 仅保留声明文件名的最后一段；结果为空、`.` 或 `..` 时返回 None
    pub fn new(declared_name: &str, bytes: Bytes) -> Option<Self> {
        let name = declared_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if name.is_empty() || name == "." || name == ".." {
            return None;
        }
        Some(Self {
            filename: name.to_string(),
            bytes,
        })
    }
}

/// `/upload` 成功响应
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TriagePrediction {
    pub prediction: XrayClass,
    /// 预测类别的概率
    #[schema(example = 0.93)]
    pub probability: f64,
}

/// `/upload` 表单（仅用于文档）
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// X 光影像（JPEG / PNG / DICOM）
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_largest_and_first_on_tie() {
        let (class, p) = XrayClass::argmax(&[0.1, 0.7, 0.2]).expect("valid");
        assert_eq!(class, XrayClass::Malignant);
        assert!((p - 0.7).abs() < 1e-6);

        let (class, _) = XrayClass::argmax(&[0.4, 0.4, 0.2]).expect("valid");
        assert_eq!(class, XrayClass::Benign);
    }

    #[test]
    fn argmax_rejects_bad_vectors() {
        assert!(XrayClass::argmax(&[0.5, 0.5]).is_err());
        assert!(XrayClass::argmax(&[0.2, f32::NAN, 0.3]).is_err());
        assert!(XrayClass::argmax(&[2.0, -1.0, 0.0]).is_err());
    }

    #[test]
    fn class_serializes_as_plain_name() {
        let v = serde_json::to_value(TriagePrediction {
            prediction: XrayClass::Normal,
            probability: 0.5,
        })
        .expect("serialize");
        assert_eq!(v["prediction"], "Normal");
    }

    #[test]
    fn uploaded_file_strips_path_components() {
        let f = UploadedFile::new("../../etc/passwd", Bytes::new()).expect("name");
        assert_eq!(f.filename, "passwd");
        let f = UploadedFile::new("C:\\scans\\chest.png", Bytes::new()).expect("name");
        assert_eq!(f.filename, "chest.png");
        assert!(UploadedFile::new("", Bytes::new()).is_none());
        assert!(UploadedFile::new("scans/..", Bytes::new()).is_none());
    }
}
