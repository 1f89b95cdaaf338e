// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! OpenCV 视频写入 (mp4v)

use std::path::Path;

use image::RgbImage;
use log::info;
use opencv::core::Size;
use opencv::prelude::*;
use opencv::videoio::VideoWriter;

use super::{FrameSink, SinkSpec};
use crate::error::{DetectError, Result};
use crate::input::capture::rgb_to_mat;

pub struct OpenCvWriter {
    writer: VideoWriter,
    path: String,
    finished: bool,
}

impl OpenCvWriter {
    pub fn create(path: &Path, spec: SinkSpec) -> Result<Self> {
        let target = path.display().to_string();
        let fourcc =
            VideoWriter::fourcc('m', 'p', '4', 'v').map_err(|e| DetectError::write(&target, e))?;
        let writer = VideoWriter::new(
            &path.to_string_lossy(),
            fourcc,
            spec.fps,
            Size::new(spec.width as i32, spec.height as i32),
            true,
        )
        .map_err(|e| DetectError::write(&target, e))?;

        if !writer
            .is_opened()
            .map_err(|e| DetectError::write(&target, e))?
        {
            return Err(DetectError::write(&target, "video writer did not open"));
        }
        info!(
            "💾 输出视频: {} ({}x{} @ {:.2} fps)",
            target, spec.width, spec.height, spec.fps
        );

        Ok(Self {
            writer,
            path: target,
            finished: false,
        })
    }
}

impl FrameSink for OpenCvWriter {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        let mat = rgb_to_mat(frame)?;
        self.writer
            .write(&mat)
            .map_err(|e| DetectError::write(&self.path, e))
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.writer
            .release()
            .map_err(|e| DetectError::write(&self.path, e))
    }
}

impl Drop for OpenCvWriter {
    fn drop(&mut self) {
        let _ = self.finish();
    }
}
