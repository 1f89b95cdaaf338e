// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测器 (Detector)
//! 职责: 单帧 → 推理后端 → 车辆过滤 → 检测结果

use std::path::Path;

use image::RgbImage;
use log::info;

use super::filter::filter_vehicles;
use super::taxonomy::VehicleTaxonomy;
use super::types::Detection;
use crate::assets;
use crate::config::DetectorConfig;
use crate::error::Result;
use crate::models::{Model, YOLOv8, YOLOv8Config};
use crate::settings::Settings;

/// 一个检测器持有一份不可变配置和一个已加载的模型, 实例之间不共享可变状态
pub struct Detector<M> {
    config: DetectorConfig,
    model: M,
    model_name: String,
    taxonomy: VehicleTaxonomy,
}

impl<M: Model> Detector<M> {
    pub fn new(config: DetectorConfig, model: M) -> Self {
        Self {
            model_name: config.model_identifier().to_string(),
            config,
            model,
            taxonomy: VehicleTaxonomy::coco(),
        }
    }

    /// 覆盖记录中的模型名 (如自定义权重)
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// 实际加载的模型名, 写入检测记录
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn taxonomy(&self) -> &VehicleTaxonomy {
        &self.taxonomy
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// 推理 + 过滤; 后端失败时不返回任何部分结果
    pub fn detect_frame(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let raw = self
            .model
            .forward(frame, self.config.confidence_threshold())?;
        Ok(filter_vehicles(&raw, &self.taxonomy))
    }
}

impl Detector<YOLOv8> {
    /// 按配置定位权重并加载 YOLOv8
    pub fn load(config: DetectorConfig, settings: &Settings, weights: Option<&Path>) -> Result<Self> {
        let weights = assets::resolve_model(config.model(), weights, settings.models_dir.as_deref())?;
        let name = weights_name(&weights, config.model_identifier());
        info!("📦 加载模型: {} ({})", name, weights.display());

        let model = YOLOv8::new(YOLOv8Config {
            kind: config.model(),
            weights,
            inference_size: settings.inference_size,
            iou: settings.iou_threshold,
            profile: log::log_enabled!(log::Level::Debug),
        })?;
        info!("✅ 模型加载成功");
        model.summary();

        Ok(Self::new(config, model).with_model_name(name))
    }
}

/// 权重文件名 (不含扩展名), 取不到时使用模型标识
fn weights_name(weights: &Path, fallback: &str) -> String {
    weights
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_name_follows_loaded_weights() {
        assert_eq!(weights_name(Path::new("models/yolov8n.onnx"), "yolov8n"), "yolov8n");
        assert_eq!(weights_name(Path::new("/opt/custom.onnx"), "yolov8n"), "custom");
        assert_eq!(weights_name(Path::new("/"), "yolov8s"), "yolov8s");
    }
}
