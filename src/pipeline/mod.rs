// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测流水线 (Detection Pipeline)
///
/// 单线程同步执行, 每帧依次: 读取 → 推理 → 过滤 → 绘制 → 输出/显示
/// - image_pipeline: 单张图片与目录批处理
/// - video_pipeline: 视频流状态机, 任何退出路径都只清理一次
pub mod image_pipeline;
pub mod video_pipeline;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbImage;

use crate::detection::{Detection, Detector};
use crate::error::{DetectError, Result};
use crate::input::{FrameSource, InputSource};
use crate::models::Model;
use crate::output::{FrameSink, SinkSpec};
use crate::renderer::{Annotator, DisplaySurface, FontPainter, TextPainter};
use crate::settings::Settings;

pub use image_pipeline::is_supported_image;
pub use video_pipeline::StreamState;

/// 视频 I/O 后端: 打开帧源、写入端与显示窗口
pub trait MediaBackend {
    type Source: FrameSource;
    type Sink: FrameSink;
    type Window: DisplaySurface;

    fn open_source(&self, source: &InputSource) -> Result<Self::Source>;

    /// 编码参数在打开时确定, 之后不再改变
    fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<Self::Sink>;

    fn open_window(&self, title: &str) -> Result<Self::Window>;
}

#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvBackend;

#[cfg(feature = "opencv")]
mod opencv_backend {
    use std::path::Path;

    use super::MediaBackend;
    use crate::error::Result;
    use crate::input::{InputSource, OpenCvCapture};
    use crate::output::{OpenCvWriter, SinkSpec};
    use crate::renderer::HighGuiWindow;

    /// OpenCV videoio + highgui
    #[derive(Debug, Default, Clone, Copy)]
    pub struct OpenCvBackend;

    impl MediaBackend for OpenCvBackend {
        type Source = OpenCvCapture;
        type Sink = OpenCvWriter;
        type Window = HighGuiWindow;

        fn open_source(&self, source: &InputSource) -> Result<OpenCvCapture> {
            OpenCvCapture::open(source)
        }

        fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<OpenCvWriter> {
            OpenCvWriter::create(path, spec)
        }

        fn open_window(&self, title: &str) -> Result<HighGuiWindow> {
            HighGuiWindow::open(title)
        }
    }
}

/// 外部取消信号 (如 Ctrl-C), 在每次循环开始时检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 源帧率与配置的回退帧率都无效时的输出帧率
pub const DEFAULT_FPS: f64 = 30.0;

pub(crate) fn valid_fps(fps: f64) -> Option<f64> {
    (fps.is_finite() && fps > 0.0).then_some(fps)
}

/// 视频循环参数
#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    /// 源帧率为 0 或未知时输出使用的帧率
    pub fallback_fps: f64,
    pub quit_key: char,
    pub window_title: String,
    /// 连续解码失败达到该次数后终止 (0 = 不限制)
    pub max_consecutive_decode_errors: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl VideoOptions {
    /// 回退帧率; 非有限值或不大于 0 时为 [`DEFAULT_FPS`]
    pub fn effective_fallback_fps(&self) -> f64 {
        valid_fps(self.fallback_fps).unwrap_or(DEFAULT_FPS)
    }
}

impl From<&Settings> for VideoOptions {
    fn from(s: &Settings) -> Self {
        Self {
            fallback_fps: valid_fps(s.fallback_fps).unwrap_or(DEFAULT_FPS),
            quit_key: s.quit_key,
            window_title: s.window_title.clone(),
            max_consecutive_decode_errors: s.max_consecutive_decode_errors,
        }
    }
}

/// 一次视频检测请求
#[derive(Debug, Clone)]
pub struct VideoRequest {
    pub source: InputSource,
    pub output: Option<PathBuf>,
    pub display: bool,
    pub options: VideoOptions,
    pub cancel: CancelFlag,
}

impl VideoRequest {
    pub fn new(source: InputSource) -> Self {
        Self {
            source,
            output: None,
            display: false,
            options: VideoOptions::default(),
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    pub fn with_display(mut self, display: bool) -> Self {
        self.display = display;
        self
    }

    pub fn with_options(mut self, options: VideoOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }
}

/// 视频处理结束后的汇总
///
/// 输出视频关闭失败记录在 `write_error` 中, 已处理的帧数仍然有效
#[derive(Debug, Default)]
pub struct StreamReport {
    /// 成功处理的帧数
    pub frames: u64,
    /// 因解码失败跳过的帧数
    pub skipped: u64,
    pub wrote_output: bool,
    pub cancelled: bool,
    pub write_error: Option<DetectError>,
}

/// 单张图片检测结果
///
/// 输出保存失败记录在 `write_error` 中, 检测结果仍然有效
#[derive(Debug)]
pub struct ImageDetection {
    pub annotated: RgbImage,
    pub detections: Vec<Detection>,
    pub write_error: Option<DetectError>,
}

/// 批处理中成功处理的一张图片
#[derive(Debug)]
pub struct BatchEntry {
    pub source: PathBuf,
    pub output: PathBuf,
    pub detections: Vec<Detection>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub entries: Vec<BatchEntry>,
    pub failures: Vec<(PathBuf, DetectError)>,
}

impl BatchReport {
    pub fn total_vehicles(&self) -> usize {
        self.entries.iter().map(|e| e.detections.len()).sum()
    }
}

/// 检测器 + 标注器
pub struct VehiclePipeline<M, P = FontPainter> {
    detector: Detector<M>,
    annotator: Annotator<P>,
}

impl<M: Model, P: TextPainter> VehiclePipeline<M, P> {
    pub fn new(detector: Detector<M>, annotator: Annotator<P>) -> Self {
        Self {
            detector,
            annotator,
        }
    }

    pub fn detector(&self) -> &Detector<M> {
        &self.detector
    }

    pub fn annotator(&self) -> &Annotator<P> {
        &self.annotator
    }
}
