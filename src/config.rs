// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 命令行参数与检测器配置

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;

use crate::error::{DetectError, Result};

/// 预训练权重 (按 速度 → 精度 排序)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ModelKind {
    /// yolov8n: 最快, 适合实时
    #[default]
    Nano,
    Small,
    Medium,
    Large,
    /// yolov8x: 最精确, 最慢
    XLarge,
}

impl ModelKind {
    pub const ALL: [ModelKind; 5] = [
        ModelKind::Nano,
        ModelKind::Small,
        ModelKind::Medium,
        ModelKind::Large,
        ModelKind::XLarge,
    ];

    pub fn identifier(&self) -> &'static str {
        match self {
            ModelKind::Nano => "yolov8n",
            ModelKind::Small => "yolov8s",
            ModelKind::Medium => "yolov8m",
            ModelKind::Large => "yolov8l",
            ModelKind::XLarge => "yolov8x",
        }
    }

    /// 从标识符推断权重类型
    ///
    /// 接受 `n`, `yolov8n`, `yolov8n.pt`, `yolov8n.onnx` 以及带目录的路径
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        let name = Path::new(identifier.trim())
            .file_name()
            .and_then(|n| n.to_str())?
            .to_ascii_lowercase();
        let stem = name
            .strip_suffix(".onnx")
            .or_else(|| name.strip_suffix(".pt"))
            .unwrap_or(&name);
        Self::ALL
            .into_iter()
            .find(|k| k.identifier() == stem || k.identifier().strip_prefix("yolov8") == Some(stem))
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_identifier(s).ok_or_else(|| {
            let known: Vec<_> = Self::ALL.iter().map(|k| k.identifier()).collect();
            format!("unknown model `{}` (expected one of {})", s, known.join(", "))
        })
    }
}

/// 检测器配置, 构造后不可变
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    model: ModelKind,
    confidence_threshold: f32,
}

impl DetectorConfig {
    pub fn new(model: ModelKind, confidence_threshold: f32) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(DetectError::InvalidConfig(format!(
                "confidence threshold must be within [0, 1], got {}",
                confidence_threshold
            )));
        }
        Ok(Self {
            model,
            confidence_threshold,
        })
    }

    pub fn model(&self) -> ModelKind {
        self.model
    }

    pub fn model_identifier(&self) -> &'static str {
        self.model.identifier()
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.confidence_threshold
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: ModelKind::Nano,
            confidence_threshold: 0.5,
        }
    }
}

/// 车辆检测参数
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "车辆检测 - Vehicle detection with YOLOv8", long_about = None)]
pub struct Args {
    /// 输入图片/视频路径, 图片目录(--batch), 或摄像头编号 (0 为默认摄像头)
    #[arg(short, long)]
    pub input: String,

    /// 输出图片/视频路径 (批处理模式下为输出目录)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 模型大小 (n=nano, s=small, m=medium, l=large, x=xlarge)
    #[arg(short, long, default_value = "yolov8n")]
    pub model: ModelKind,

    /// 显式指定 ONNX 权重文件 (覆盖按模型名查找)
    #[arg(long)]
    pub weights: Option<PathBuf>,

    /// 置信度阈值 (0.0-1.0)
    #[arg(short, long, default_value_t = 0.5)]
    pub conf: f32,

    /// 不显示结果窗口
    #[arg(long)]
    pub no_show: bool,

    /// 按视频处理 (文件或摄像头)
    #[arg(short, long)]
    pub video: bool,

    /// 批量处理目录中的所有图片
    #[arg(long, conflicts_with = "video")]
    pub batch: bool,

    /// 保存检测结果为 JSON (视频模式下为 JSON Lines)
    #[arg(long)]
    pub save_json: Option<PathBuf>,

    /// 设置文件 (JSON), 不存在时创建默认设置
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// 标签字体 (TTF)
    #[arg(long)]
    pub font: Option<PathBuf>,
}

impl Args {
    pub fn detector_config(&self) -> Result<DetectorConfig> {
        DetectorConfig::new(self.model, self.conf)
    }

    pub fn show(&self) -> bool {
        !self.no_show
    }
}
