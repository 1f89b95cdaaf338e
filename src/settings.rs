// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 流水线设置 - 通过JSON文件调整参数

use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// 绘制/视频/推理参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === 推理参数 ===
    pub inference_size: u32, // 模型输入尺寸
    pub iou_threshold: f32,  // NMS IOU阈值
    pub models_dir: Option<PathBuf>,

    // === 绘制参数 ===
    pub box_color: [u8; 3],
    pub label_text_color: [u8; 3],
    pub box_thickness: u32,
    pub image_label_scale: f32,
    pub video_label_scale: f32,
    pub overlay_scale: f32,
    pub overlay_position: (i32, i32),
    pub font_path: Option<PathBuf>,

    // === 视频参数 ===
    pub fallback_fps: f64, // 源帧率为0/未知时使用
    pub quit_key: char,
    pub window_title: String,
    pub max_consecutive_decode_errors: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inference_size: 640,
            iou_threshold: 0.45,
            models_dir: None,

            box_color: [0, 255, 0],
            label_text_color: [0, 0, 0],
            box_thickness: 2,
            image_label_scale: 20.0,
            video_label_scale: 16.0,
            overlay_scale: 28.0,
            overlay_position: (10, 10),
            font_path: None,

            fallback_fps: 30.0,
            quit_key: 'q',
            window_title: "Car Detection".to_string(),
            max_consecutive_decode_errors: 30,
        }
    }
}

impl Settings {
    /// 从JSON文件加载设置
    ///
    /// 文件不存在时写出默认设置, 解析失败时使用默认值
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    info!("✅ 设置已从 {} 加载", path.display());
                    settings
                }
                Err(e) => {
                    warn!("⚠️  设置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 设置文件不存在,创建默认设置...");
                let settings = Self::default();
                if let Err(e) = settings.save(path) {
                    warn!("⚠️  {}", e);
                }
                settings
            }
        }
    }

    /// 保存设置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| DetectError::write(path.display(), e))?;
        fs::write(path, json).map_err(|e| DetectError::write(path.display(), e))?;
        info!("💾 设置已保存到 {}", path.display());
        Ok(())
    }

    pub fn print_summary(&self) {
        info!("🎛️  当前设置:");
        info!("  推理尺寸: {}  IOU: {:.2}", self.inference_size, self.iou_threshold);
        info!("  线宽: {}  退出键: '{}'", self.box_thickness, self.quit_key);
        info!("  后备帧率: {:.1}", self.fallback_fps);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_creates_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings::load(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "fallback_fps": 12.5, "quit_key": "x" }"#).unwrap();
        let settings = Settings::load(&path);
        assert_eq!(settings.fallback_fps, 12.5);
        assert_eq!(settings.quit_key, 'x');
        assert_eq!(settings.box_thickness, 2);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load(&path), Settings::default());
    }
}
