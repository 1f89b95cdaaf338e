// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 视频输入 (Video Input)
///
/// - InputSource: 文件路径或摄像头编号
/// - FrameSource: 拉取式帧源, 逐帧读取直到流结束
/// - OpenCvCapture: 基于 OpenCV VideoCapture 的帧源 (`opencv` feature)
#[cfg(feature = "opencv")]
pub mod capture;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use image::RgbImage;

use crate::error::Result;

#[cfg(feature = "opencv")]
pub use capture::OpenCvCapture;

/// 视频输入源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    File(PathBuf),
    Camera(i32),
}

impl InputSource {
    /// 纯数字视为摄像头编号, 其余视为文件路径
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(index) = trimmed.parse() {
                return InputSource::Camera(index);
            }
        }
        InputSource::File(PathBuf::from(input))
    }

    pub fn is_camera(&self) -> bool {
        matches!(self, InputSource::Camera(_))
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::File(path) => write!(f, "{}", path.display()),
            InputSource::Camera(index) => write!(f, "camera #{}", index),
        }
    }
}

impl FromStr for InputSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl From<PathBuf> for InputSource {
    fn from(path: PathBuf) -> Self {
        InputSource::File(path)
    }
}

/// 拉取式帧源
pub trait FrameSource {
    /// 读取下一帧; `Ok(None)` 表示流结束, `Err(Decode)` 表示仅该帧损坏
    fn read_frame(&mut self) -> Result<Option<RgbImage>>;

    /// 源报告的帧率, 未知时为 0
    fn fps(&self) -> f64;

    /// (宽, 高), 未知时为 (0, 0)
    fn dimensions(&self) -> (u32, u32);

    /// 释放底层设备/文件句柄, 可重复调用
    fn release(&mut self);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).read_frame()
    }

    fn fps(&self) -> f64 {
        (**self).fps()
    }

    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_select_a_camera() {
        assert_eq!(InputSource::parse("0"), InputSource::Camera(0));
        assert_eq!(InputSource::parse("2"), InputSource::Camera(2));
    }

    #[test]
    fn everything_else_is_a_file() {
        assert_eq!(
            InputSource::parse("traffic.mp4"),
            InputSource::File(PathBuf::from("traffic.mp4"))
        );
        assert_eq!(
            InputSource::parse("-1"),
            InputSource::File(PathBuf::from("-1"))
        );
        assert!(!InputSource::parse("").is_camera());
    }

    #[test]
    fn display_names_the_source() {
        assert_eq!(InputSource::Camera(1).to_string(), "camera #1");
        assert_eq!(
            "clips/a.mp4".parse::<InputSource>().unwrap().to_string(),
            "clips/a.mp4"
        );
    }
}
