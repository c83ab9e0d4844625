//! 上传文件类型识别
//!
//! 按固定顺序依次尝试各识别器，返回第一个命中的类型：
//! JPEG → PNG（按内容魔数识别）→ DICOM（Part 10 文件头解析）。

use image::ImageFormat;

/// 可接受的上传文件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Jpeg,
    Png,
    Dicom,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Jpeg => "jpeg",
            FileKind::Png => "png",
            FileKind::Dicom => "dicom",
        }
    }
}

/// 单个类型识别器
pub trait FileValidator: Sync {
    fn kind(&self) -> FileKind;
    fn matches(&self, bytes: &[u8]) -> bool;
}

/// 基于内容魔数的位图识别
struct BitmapSniffer {
    format: ImageFormat,
    kind: FileKind,
}

impl FileValidator for BitmapSniffer {
    fn kind(&self) -> FileKind {
        self.kind
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        image::guess_format(bytes).is_ok_and(|f| f == self.format)
    }
}

/// DICOM Part 10 文件头解析
struct DicomParser;

impl FileValidator for DicomParser {
    fn kind(&self) -> FileKind {
        FileKind::Dicom
    }

    fn matches(&self, bytes: &[u8]) -> bool {
        parse_dicom_meta(bytes).is_some()
    }
}

static VALIDATORS: [&dyn FileValidator; 3] = [
    &BitmapSniffer {
        format: ImageFormat::Jpeg,
        kind: FileKind::Jpeg,
    },
    &BitmapSniffer {
        format: ImageFormat::Png,
        kind: FileKind::Png,
    },
    &DicomParser,
];

/// 识别上传内容；均不匹配时返回 None
pub fn detect(bytes: &[u8]) -> Option<FileKind> {
    VALIDATORS
        .iter()
        .find(|v| v.matches(bytes))
        .map(|v| v.kind())
}

const DICOM_PREAMBLE_LEN: usize = 128;
const DICOM_MAGIC: &[u8; 4] = b"DICM";
const META_GROUP: u16 = 0x0002;
const TRANSFER_SYNTAX_ELEMENT: u16 = 0x0010;

/// 解析得到的文件元信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DicomMeta {
    /// 文件元信息组中的元素个数
    pub elements: usize,
    /// (0002,0010) 传输语法 UID
    pub transfer_syntax: Option<String>,
}

/// 解析 DICOM Part 10 文件头：128 字节前导、`DICM` 魔数，以及显式 VR 小端编码的
/// (0002,xxxx) 文件元信息组。元信息组至少包含一个元素，且每个元素长度不得越界。
pub fn parse_dicom_meta(bytes: &[u8]) -> Option<DicomMeta> {
    let magic_end = DICOM_PREAMBLE_LEN + DICOM_MAGIC.len();
    if bytes.get(DICOM_PREAMBLE_LEN..magic_end)? != DICOM_MAGIC {
        return None;
    }

    let mut pos = magic_end;
    let mut meta = DicomMeta {
        elements: 0,
        transfer_syntax: None,
    };

    while let Some(header) = bytes.get(pos..pos + 8) {
        let group = u16::from_le_bytes([header[0], header[1]]);
        if group != META_GROUP {
            break;
        }
        let element = u16::from_le_bytes([header[2], header[3]]);
        let vr = [header[4], header[5]];
        if !vr.iter().all(u8::is_ascii_uppercase) {
            return None;
        }

        let (len, value_start) = if has_long_length(vr) {
            let raw = bytes.get(pos + 8..pos + 12)?;
            let len = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
            (usize::try_from(len).ok()?, pos + 12)
        } else {
            (usize::from(u16::from_le_bytes([header[6], header[7]])), pos + 8)
        };

        let value_end = value_start.checked_add(len)?;
        let value = bytes.get(value_start..value_end)?;
        if element == TRANSFER_SYNTAX_ELEMENT {
            let uid = String::from_utf8_lossy(value)
                .trim_end_matches(['\0', ' '])
                .to_string();
            meta.transfer_syntax = Some(uid);
        }
        meta.elements += 1;
        pos = value_end;
    }

    (meta.elements > 0).then_some(meta)
}

/// 使用 4 字节长度字段的 VR
fn has_long_length(vr: [u8; 2]) -> bool {
    matches!(
        &vr,
        b"OB" | b"OD" | b"OF" | b"OL" | b"OV" | b"OW" | b"SQ" | b"SV" | b"UC" | b"UN" | b"UR"
            | b"UT" | b"UV"
    )
}
