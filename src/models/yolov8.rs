// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 检测模型实现
// 包含: 模型加载、预处理、推理、后处理

use std::path::PathBuf;

use image::{imageops, RgbImage};
use log::{debug, info};
use ndarray::{s, Array, ArrayView, Axis, IxDyn};

use super::{Model, RawBox};
use crate::config::ModelKind;
use crate::error::{DetectError, Result};
use crate::non_max_suppression;
use crate::ort_backend::{OrtBackend, OrtConfig};

/// 每个 anchor 前 4 个值为 cx, cy, w, h
const CXYWH_OFFSET: usize = 4;

/// 填充色 (letterbox 灰边)
const PAD_VALUE: f32 = 144.0 / 255.0;

/// YOLOv8 加载参数
#[derive(Debug, Clone)]
pub struct YOLOv8Config {
    pub kind: ModelKind,
    pub weights: PathBuf,
    pub inference_size: u32,
    pub iou: f32,
    pub profile: bool,
}

impl YOLOv8Config {
    pub fn new(kind: ModelKind, weights: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            weights: weights.into(),
            inference_size: 640,
            iou: 0.45,
            profile: false,
        }
    }
}

/// YOLOv8 完整模型结构
pub struct YOLOv8 {
    engine: OrtBackend,
    kind: ModelKind,
    height: u32,
    width: u32,
    iou: f32,
    profile: bool,
}

impl YOLOv8 {
    /// 从配置创建 YOLOv8 模型
    pub fn new(config: YOLOv8Config) -> Result<Self> {
        let engine = OrtBackend::build(OrtConfig {
            f: config.weights,
            image_size: (config.inference_size, config.inference_size),
        })?;
        let (height, width) = (engine.height(), engine.width());

        Ok(Self {
            engine,
            kind: config.kind,
            height,
            width,
            iou: config.iou,
            profile: config.profile,
        })
    }

    /// 预处理: 等比缩放到输入尺寸, 其余区域用灰色填充, 输出 NCHW
    pub fn preprocess(&self, x: &RgbImage) -> Array<f32, IxDyn> {
        let mut ys = Array::from_elem(
            (1, 3, self.height as usize, self.width as usize),
            PAD_VALUE,
        )
        .into_dyn();

        let (w0, h0) = x.dimensions();
        let (_, w_new, h_new) = scale_wh(
            w0 as f32,
            h0 as f32,
            self.width as f32,
            self.height as f32,
        );
        let img = imageops::resize(
            x,
            (w_new as u32).max(1),
            (h_new as u32).max(1),
            imageops::FilterType::Triangle,
        );

        for (x, y, rgb) in img.enumerate_pixels() {
            let x = x as usize;
            let y = y as usize;
            let [r, g, b] = rgb.0;
            ys[[0, 0, y, x]] = (r as f32) / 255.0;
            ys[[0, 1, y, x]] = (g as f32) / 255.0;
            ys[[0, 2, y, x]] = (b as f32) / 255.0;
        }

        ys
    }

    pub fn run(&mut self, x: &RgbImage, conf: f32) -> Result<Vec<RawBox>> {
        let (w0, h0) = x.dimensions();
        if w0 == 0 || h0 == 0 {
            return Err(DetectError::adapter("empty frame"));
        }

        let t_pre = std::time::Instant::now();
        let xs = self.preprocess(x);
        if self.profile {
            debug!("[Model Preprocess]: {:?}", t_pre.elapsed());
        }

        let t_run = std::time::Instant::now();
        let ys = self.engine.run(xs)?;
        if self.profile {
            debug!("[Model Inference]: {:?}", t_run.elapsed());
        }

        let t_post = std::time::Instant::now();
        let boxes = decode_predictions(
            ys.view(),
            (w0, h0),
            (self.width, self.height),
            conf,
            self.iou,
        )?;
        if self.profile {
            debug!("[Model Postprocess]: {:?}", t_post.elapsed());
        }

        Ok(boxes)
    }

    pub fn summary(&self) {
        info!(
            "📦 Summary: {} ({}) | Input: {}x{} | iou: {}",
            self.kind,
            self.engine.model_path().display(),
            self.width,
            self.height,
            self.iou,
        );
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn iou(&self) -> f32 {
        self.iou
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl Model for YOLOv8 {
    fn forward(&mut self, frame: &RgbImage, conf: f32) -> Result<Vec<RawBox>> {
        self.run(frame, conf)
    }

    fn summary(&self) {
        YOLOv8::summary(self)
    }
}

fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// 后处理: `[1, 4 + nc, anchors]` → 原图坐标下的检测框
///
/// 每个 anchor 取最高分类别, 低于 `conf` 的丢弃, 坐标还原到原图并裁剪到图像范围, 最后做 NMS
pub fn decode_predictions(
    preds: ArrayView<f32, IxDyn>,
    original: (u32, u32),
    input: (u32, u32),
    conf: f32,
    iou: f32,
) -> Result<Vec<RawBox>> {
    let shape = preds.shape();
    if shape.len() != 3 || shape[0] < 1 || shape[1] <= CXYWH_OFFSET {
        return Err(DetectError::adapter(format!(
            "unexpected output shape {:?}, expected [1, 4 + nc, anchors]",
            shape
        )));
    }

    let width_original = original.0 as f32;
    let height_original = original.1 as f32;
    let ratio = (input.0 as f32 / width_original).min(input.1 as f32 / height_original);

    let anchor = preds.index_axis(Axis(0), 0);
    let mut data: Vec<RawBox> = Vec::new();
    for pred in anchor.axis_iter(Axis(1)) {
        let bbox = pred.slice(s![0..CXYWH_OFFSET]);
        let clss = pred.slice(s![CXYWH_OFFSET..]);

        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };

        if confidence < conf {
            continue;
        }

        let cx = bbox[0] / ratio;
        let cy = bbox[1] / ratio;
        let w = bbox[2] / ratio;
        let h = bbox[3] / ratio;
        data.push(RawBox::new(
            id as u32,
            confidence,
            [
                (cx - w / 2.).clamp(0.0, width_original),
                (cy - h / 2.).clamp(0.0, height_original),
                (cx + w / 2.).clamp(0.0, width_original),
                (cy + h / 2.).clamp(0.0, height_original),
            ],
        ));
    }

    non_max_suppression(&mut data, iou);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造 `[1, 4 + nc, anchors]` 输出
    fn output(anchors: &[([f32; 4], Vec<f32>)]) -> Array<f32, IxDyn> {
        let nc = anchors[0].1.len();
        let mut ys = Array::zeros((1, CXYWH_OFFSET + nc, anchors.len())).into_dyn();
        for (i, (cxcywh, scores)) in anchors.iter().enumerate() {
            for (j, v) in cxcywh.iter().chain(scores.iter()).enumerate() {
                ys[[0, j, i]] = *v;
            }
        }
        ys
    }

    #[test]
    fn boxes_are_rescaled_to_original_frame() {
        // 1280x640 原图 → 640x640 输入, ratio = 0.5
        let ys = output(&[([100., 100., 40., 20.], vec![0.1, 0.1, 0.9])]);
        let boxes = decode_predictions(ys.view(), (1280, 640), (640, 640), 0.5, 0.45).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].class_id, 2);
        assert_eq!(boxes[0].bbox, [160., 180., 240., 220.]);
    }

    #[test]
    fn low_confidence_anchors_are_dropped() {
        let ys = output(&[
            ([100., 100., 40., 20.], vec![0.0, 0.0, 0.4]),
            ([300., 300., 40., 20.], vec![0.0, 0.0, 0.6]),
        ]);
        let boxes = decode_predictions(ys.view(), (640, 640), (640, 640), 0.5, 0.45).unwrap();
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].confidence - 0.6).abs() < 1e-6);
    }

    #[test]
    fn overlapping_duplicates_are_suppressed() {
        let ys = output(&[
            ([100., 100., 40., 40.], vec![0.0, 0.0, 0.7]),
            ([101., 101., 40., 40.], vec![0.0, 0.0, 0.9]),
        ]);
        let boxes = decode_predictions(ys.view(), (640, 640), (640, 640), 0.5, 0.45).unwrap();
        assert_eq!(boxes.len(), 1);
        assert!((boxes[0].confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn boxes_are_clamped_to_frame() {
        let ys = output(&[([5., 5., 40., 40.], vec![0.9])]);
        let boxes = decode_predictions(ys.view(), (640, 640), (640, 640), 0.5, 0.45).unwrap();
        assert_eq!(boxes[0].bbox[0], 0.0);
        assert_eq!(boxes[0].bbox[1], 0.0);
    }

    #[test]
    fn malformed_output_is_an_adapter_error() {
        let ys = Array::<f32, _>::zeros((1, 4)).into_dyn();
        assert!(matches!(
            decode_predictions(ys.view(), (640, 640), (640, 640), 0.5, 0.45),
            Err(DetectError::Adapter(_))
        ));
    }
}
