// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX Runtime 推理引擎封装

use std::fmt::Display;
use std::path::{Path, PathBuf};

use ndarray::{Array, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{DetectError, Result};

#[derive(Debug, Clone)]
pub struct OrtConfig {
    pub f: PathBuf,
    pub image_size: (u32, u32), // (height, width)
}

pub struct OrtBackend {
    session: Session,
    f: PathBuf,
    height: u32,
    width: u32,
}

impl OrtBackend {
    /// 加载模型; 整个会话期间只加载一次
    pub fn build(config: OrtConfig) -> Result<Self> {
        let (height, width) = config.image_size;
        if height == 0 || width == 0 || height % 32 != 0 || width % 32 != 0 {
            return Err(DetectError::InvalidConfig(format!(
                "inference size must be a positive multiple of 32, got {}x{}",
                width, height
            )));
        }

        let session = Session::builder()
            .map_err(|e| load_err(&config.f, e))?
            .commit_from_file(&config.f)
            .map_err(|e| load_err(&config.f, e))?;

        Ok(Self {
            session,
            f: config.f,
            height,
            width,
        })
    }

    /// 执行前向传播, 返回第一个输出张量 (检测头 `output0`)
    pub fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>> {
        let input = Tensor::from_array(xs).map_err(DetectError::adapter)?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(DetectError::adapter)?;
        let y = outputs[0]
            .try_extract_array::<f32>()
            .map_err(DetectError::adapter)?;
        Ok(y.into_owned())
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn model_path(&self) -> &Path {
        &self.f
    }
}

fn load_err(f: &Path, e: impl Display) -> DetectError {
    DetectError::adapter(format!("failed to load {}: {}", f.display(), e))
}
