// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测结果文件 (JSON)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::detector::Detector;
use super::types::Detection;
use crate::models::Model;
use crate::error::{DetectError, Result};
use crate::gen_time_string;

/// 一次图片检测的结果记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLog {
    pub source: String,
    pub model: String,
    pub confidence_threshold: f32,
    pub generated_at: String,
    pub detections: Vec<Detection>,
}

impl DetectionLog {
    /// `model` 取检测器实际加载的模型名
    pub fn new<M: Model>(source: &Path, detector: &Detector<M>, detections: &[Detection]) -> Self {
        Self {
            source: source.display().to_string(),
            model: detector.model_name().to_string(),
            confidence_threshold: detector.config().confidence_threshold(),
            generated_at: gen_time_string("-"),
            detections: detections.to_vec(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DetectError::write(path.display(), e))?;
        fs::write(path, json).map_err(|e| DetectError::write(path.display(), e))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json =
            fs::read_to_string(path).map_err(|e| DetectError::decode(path.display(), e))?;
        serde_json::from_str(&json).map_err(|e| DetectError::decode(path.display(), e))
    }
}
