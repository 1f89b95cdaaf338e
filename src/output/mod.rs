// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 输出: 标注图片保存与视频写入

#[cfg(feature = "opencv")]
pub mod writer;

use std::borrow::Cow;
use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::{DetectError, Result};

#[cfg(feature = "opencv")]
pub use writer::OpenCvWriter;

/// 视频输出参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SinkSpec {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl SinkSpec {
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

/// 视频帧写入端, 每次 `write` 追加一帧
pub trait FrameSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()>;

    /// 写完尾部并关闭文件; 之后的 `write` 无效
    fn finish(&mut self) -> Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for Box<S> {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).write(frame)
    }

    fn finish(&mut self) -> Result<()> {
        (**self).finish()
    }
}

/// 按扩展名选择编码格式保存图片
pub fn save_image(image: &RgbImage, path: &Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| DetectError::write(path.display(), e))
}

/// 尺寸与输出不一致时缩放到输出尺寸
pub fn fit_to(frame: &RgbImage, (width, height): (u32, u32)) -> Cow<'_, RgbImage> {
    if frame.dimensions() == (width, height) || width == 0 || height == 0 {
        Cow::Borrowed(frame)
    } else {
        Cow::Owned(imageops::resize(frame, width, height, FilterType::Triangle))
    }
}
