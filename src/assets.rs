// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 资源定位: 模型权重与标签字体

use std::io::Read;
use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use log::info;

use crate::config::ModelKind;
use crate::error::{DetectError, Result};

const FONT_URL: &str = "https://ultralytics.com/assets/Arial.ttf";
const FONT_FILE: &str = "Arial.ttf";

/// 缓存目录 (`~/.cache/yolov8-vehicles`)
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("yolov8-vehicles")
}

/// 查找模型权重
///
/// 顺序: 显式路径 → `models_dir/<id>.onnx` → 缓存目录 → `./models/<id>.onnx`
pub fn resolve_model(
    kind: ModelKind,
    weights: Option<&Path>,
    models_dir: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = weights {
        if path.is_file() {
            return Ok(path.to_path_buf());
        }
        return Err(DetectError::Asset(format!(
            "weights file {} not found",
            path.display()
        )));
    }

    let file = format!("{}.onnx", kind.identifier());
    let candidates = models_dir
        .map(|d| d.join(&file))
        .into_iter()
        .chain([cache_dir().join("models").join(&file), Path::new("models").join(&file)]);
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(DetectError::Asset(format!(
        "{} not found; export it with `yolo export model={}.pt format=onnx` and place it in {}",
        file,
        kind.identifier(),
        cache_dir().join("models").display()
    )))
}

/// 加载标签字体, 未指定时使用缓存的 Arial.ttf (首次下载)
pub fn load_font(path: Option<&Path>) -> Result<FontArc> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let cached = cache_dir().join(FONT_FILE);
            if !cached.is_file() {
                download(FONT_URL, &cached)?;
            }
            cached
        }
    };
    let bytes = std::fs::read(&path)
        .map_err(|e| DetectError::Asset(format!("{}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| DetectError::Asset(format!("{}: {}", path.display(), e)))
}

fn download(url: &str, dst: &Path) -> Result<()> {
    info!("⬇️  下载 {} → {}", url, dst.display());
    let asset_err = |e: &dyn std::fmt::Display| DetectError::Asset(format!("{}: {}", url, e));

    let response = ureq::get(url).call().map_err(|e| asset_err(&e))?;
    let mut buffer = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut buffer)
        .map_err(|e| asset_err(&e))?;

    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent).map_err(|e| asset_err(&e))?;
    }
    std::fs::write(dst, buffer).map_err(|e| asset_err(&e))?;
    Ok(())
}
