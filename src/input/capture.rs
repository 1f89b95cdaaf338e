// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! OpenCV 帧源与 Mat ↔ RgbImage 转换

use image::RgbImage;
use log::{debug, info};
use opencv::core::{self, Mat, Scalar};
use opencv::imgproc;
use opencv::prelude::*;
use opencv::videoio::{self, VideoCapture};

use super::{FrameSource, InputSource};
use crate::error::{DetectError, Result};

/// 基于 VideoCapture 的帧源
pub struct OpenCvCapture {
    cap: VideoCapture,
    source: String,
    fps: f64,
    width: u32,
    height: u32,
    released: bool,
}

impl OpenCvCapture {
    pub fn open(source: &InputSource) -> Result<Self> {
        let cap = match source {
            // 文件、流地址或 `%03d` 图片序列, 由 is_opened 判断是否可用
            InputSource::File(path) => VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY),
            InputSource::Camera(index) => VideoCapture::new(*index, videoio::CAP_ANY),
        }
        .map_err(|e| DetectError::open(source, e))?;

        if !cap.is_opened().map_err(|e| DetectError::open(source, e))? {
            return Err(DetectError::open(source, "capture did not open"));
        }

        let fps = cap.get(videoio::CAP_PROP_FPS).unwrap_or(0.0);
        let width = cap.get(videoio::CAP_PROP_FRAME_WIDTH).unwrap_or(0.0).max(0.0) as u32;
        let height = cap.get(videoio::CAP_PROP_FRAME_HEIGHT).unwrap_or(0.0).max(0.0) as u32;
        info!("🎬 打开视频源: {} ({}x{} @ {:.2} fps)", source, width, height, fps);

        Ok(Self {
            cap,
            source: source.to_string(),
            fps,
            width,
            height,
            released: false,
        })
    }
}

impl FrameSource for OpenCvCapture {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.released {
            return Ok(None);
        }
        let mut mat = Mat::default();
        let ok = self
            .cap
            .read(&mut mat)
            .map_err(|e| DetectError::decode(format!("frame from {}", self.source), e))?;
        if !ok || mat.empty() {
            return Ok(None);
        }
        mat_to_rgb(&mat).map(Some)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn release(&mut self) {
        if !self.released {
            let _ = self.cap.release();
            self.released = true;
            debug!("🔌 视频源已释放: {}", self.source);
        }
    }
}

impl Drop for OpenCvCapture {
    fn drop(&mut self) {
        self.release();
    }
}

/// BGR Mat → RgbImage
pub(crate) fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(mat, &mut rgb, imgproc::COLOR_BGR2RGB, 0)
        .map_err(|e| DetectError::decode("frame", e))?;
    let size = rgb.size().map_err(|e| DetectError::decode("frame", e))?;
    let data = rgb
        .data_bytes()
        .map_err(|e| DetectError::decode("frame", e))?
        .to_vec();
    RgbImage::from_raw(size.width as u32, size.height as u32, data)
        .ok_or_else(|| DetectError::decode("frame", "pixel buffer size mismatch"))
}

/// RgbImage → BGR Mat
pub(crate) fn rgb_to_mat(frame: &RgbImage) -> Result<Mat> {
    let (w, h) = frame.dimensions();
    let mut rgb = Mat::new_rows_cols_with_default(h as i32, w as i32, core::CV_8UC3, Scalar::all(0.))
        .map_err(|e| DetectError::write("frame", e))?;
    rgb.data_bytes_mut()
        .map_err(|e| DetectError::write("frame", e))?
        .copy_from_slice(frame.as_raw());

    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)
        .map_err(|e| DetectError::write("frame", e))?;
    Ok(bgr)
}
