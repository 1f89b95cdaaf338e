// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 图片检测: 解码一次 → 推理一次 → 过滤 → 在副本上绘制 → 保存/显示

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use log::{info, warn};

use super::{BatchEntry, BatchReport, ImageDetection, VehiclePipeline};
use crate::detection::count_by_class;
use crate::error::{DetectError, Result};
use crate::models::Model;
use crate::output::save_image;
use crate::renderer::{DisplaySurface, LabelStyle, TextPainter};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

/// 批处理识别的图片扩展名 (不区分大小写)
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// 按文件内容识别格式, 与扩展名无关
fn decode_image(path: &Path) -> Result<RgbImage> {
    let reader = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| DetectError::decode(path.display(), e))?;
    let image = reader
        .decode()
        .map_err(|e| DetectError::decode(path.display(), e))?;
    Ok(image.into_rgb8())
}

impl<M: Model, P: TextPainter> VehiclePipeline<M, P> {
    /// 检测单张图片
    ///
    /// 只有解码失败 (`Decode`) 和推理失败 (`Adapter`) 会返回错误;
    /// 保存失败记录在结果的 `write_error` 中
    pub fn detect_image(
        &mut self,
        image_path: &Path,
        output_path: Option<&Path>,
        display: Option<&mut dyn DisplaySurface>,
    ) -> Result<ImageDetection> {
        info!("🖼️  读取图片: {}", image_path.display());
        let frame = decode_image(image_path)?;
        self.detect_decoded(&frame, output_path, display)
    }

    /// 检测已解码的图片, `frame` 不会被修改
    pub fn detect_decoded(
        &mut self,
        frame: &RgbImage,
        output_path: Option<&Path>,
        display: Option<&mut dyn DisplaySurface>,
    ) -> Result<ImageDetection> {
        let detections = self.detector.detect_frame(frame)?;

        info!("🚗 检测到 {} 辆车", detections.len());
        for (i, det) in detections.iter().enumerate() {
            let [x1, y1, x2, y2] = det.bbox();
            info!(
                "   {}. {} ({:.2}) [{}, {}, {}, {}]",
                i + 1,
                det.class_name(),
                det.confidence(),
                x1,
                y1,
                x2,
                y2
            );
        }
        for (name, count) in count_by_class(&detections) {
            info!("   {}: {}", name, count);
        }

        let mut annotated = frame.clone();
        self.annotator
            .annotate(&mut annotated, &detections, LabelStyle::Filled);

        let write_error = output_path.and_then(|path| match save_image(&annotated, path) {
            Ok(()) => {
                info!("💾 结果已保存: {}", path.display());
                None
            }
            Err(e) => {
                warn!("❌ 保存失败: {}", e);
                Some(e)
            }
        });

        if let Some(window) = display {
            let shown = window
                .show(&annotated)
                .and_then(|_| window.wait_key(0).map(|_| ()));
            if let Err(e) = shown {
                warn!("⚠️  显示失败: {}", e);
            }
            window.close();
        }

        Ok(ImageDetection {
            annotated,
            detections,
            write_error,
        })
    }

    /// 处理目录中的所有图片, 输出为 `<output_dir>/detected_<文件名>`
    ///
    /// 单个文件的解码/保存失败记入报告后继续; 推理失败立即返回
    pub fn detect_batch(&mut self, input_dir: &Path, output_dir: &Path) -> Result<BatchReport> {
        let entries =
            fs::read_dir(input_dir).map_err(|e| DetectError::open(input_dir.display(), e))?;
        let mut images: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && is_supported_image(path))
            .collect();
        images.sort();

        fs::create_dir_all(output_dir).map_err(|e| DetectError::write(output_dir.display(), e))?;
        info!("📂 批处理 {} 张图片: {}", images.len(), input_dir.display());

        let mut report = BatchReport::default();
        for source in images {
            let name = match source.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let output = output_dir.join(format!("detected_{}", name));

            match self.detect_image(&source, Some(&output), None) {
                Ok(ImageDetection {
                    write_error: Some(e),
                    ..
                }) => report.failures.push((source, e)),
                Ok(result) => report.entries.push(BatchEntry {
                    source,
                    output,
                    detections: result.detections,
                }),
                Err(e @ DetectError::Adapter(_)) => return Err(e),
                Err(e) => {
                    warn!("⚠️  跳过 {}: {}", source.display(), e);
                    report.failures.push((source, e));
                }
            }
        }

        info!(
            "✅ 批处理完成: {} 成功, {} 失败, 共 {} 辆车",
            report.entries.len(),
            report.failures.len(),
            report.total_vehicles()
        );
        Ok(report)
    }
}
