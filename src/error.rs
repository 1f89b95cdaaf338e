// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 错误分类 (Error taxonomy)
//!
//! - `Decode`:  输入媒体无法读取/解码 (单张图片致命, 视频中单帧可跳过)
//! - `Open`:    视频源/目录无法打开 (致命)
//! - `Write`:   输出持久化失败 (报告, 不影响已计算的结果)
//! - `Adapter`: 推理后端失败 (致命, 触发清理)

use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("cannot decode {target}: {reason}")]
    Decode { target: String, reason: String },

    #[error("cannot open {target}: {reason}")]
    Open { target: String, reason: String },

    #[error("cannot write {target}: {reason}")]
    Write { target: String, reason: String },

    #[error("inference backend failure: {0}")]
    Adapter(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("asset unavailable: {0}")]
    Asset(String),
}

pub type Result<T, E = DetectError> = std::result::Result<T, E>;

impl DetectError {
    pub fn decode(target: impl Display, reason: impl Display) -> Self {
        DetectError::Decode {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn open(target: impl Display, reason: impl Display) -> Self {
        DetectError::Open {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn write(target: impl Display, reason: impl Display) -> Self {
        DetectError::Write {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn adapter(reason: impl Display) -> Self {
        DetectError::Adapter(reason.to_string())
    }

    /// 仅影响当前帧的错误 (视频流中跳过该帧继续)
    pub fn is_frame_local(&self) -> bool {
        matches!(self, DetectError::Decode { .. })
    }
}
