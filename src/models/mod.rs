// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 模型统一接口 (Model Runtime Adapter)
///
/// # 架构说明
///
/// 推理后端对流水线是黑盒:
/// - 输入: 一帧已解码的 RGB 图像 + 置信度阈值
/// - 输出: 有序的原始检测框 `RawBox` (类别 id, 置信度, 原图坐标 xyxy)
///
/// 置信度阈值只在这里应用一次, 下游过滤器不再重复过滤。
///
/// ## 使用示例
/// ```no_run
/// use yolov8_vehicles::models::{Model, YOLOv8, YOLOv8Config};
/// use yolov8_vehicles::ModelKind;
///
/// let mut model = YOLOv8::new(YOLOv8Config::new(ModelKind::Nano, "models/yolov8n.onnx"))?;
/// let frame = image::open("street.jpg").unwrap().to_rgb8();
/// let boxes = model.forward(&frame, 0.5)?;
/// # Ok::<(), yolov8_vehicles::DetectError>(())
/// ```
use image::RgbImage;

use crate::error::Result;

/// 推理后端输出的原始检测框
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawBox {
    pub class_id: u32,
    pub confidence: f32,
    /// (x1, y1, x2, y2), 左上角为原点
    pub bbox: [f32; 4],
}

impl RawBox {
    pub fn new(class_id: u32, confidence: f32, bbox: [f32; 4]) -> Self {
        Self {
            class_id,
            confidence,
            bbox,
        }
    }

    pub fn width(&self) -> f32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> f32 {
        self.bbox[3] - self.bbox[1]
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.) * self.height().max(0.)
    }

    pub fn intersection_area(&self, another: &RawBox) -> f32 {
        let l = self.bbox[0].max(another.bbox[0]);
        let r = self.bbox[2].min(another.bbox[2]);
        let t = self.bbox[1].max(another.bbox[1]);
        let b = self.bbox[3].min(another.bbox[3]);
        (r - l).max(0.) * (b - t).max(0.)
    }

    pub fn iou(&self, another: &RawBox) -> f32 {
        let union = self.area() + another.area() - self.intersection_area(another);
        if union <= 0. {
            return 0.;
        }
        self.intersection_area(another) / union
    }
}

/// 统一的推理后端接口
pub trait Model {
    /// 单帧推理, 返回置信度 >= `conf` 的原始检测框
    ///
    /// 后端失败一律返回 `DetectError::Adapter`
    fn forward(&mut self, frame: &RgbImage, conf: f32) -> Result<Vec<RawBox>>;

    /// 打印模型信息
    fn summary(&self) {}
}

impl<M: Model + ?Sized> Model for Box<M> {
    fn forward(&mut self, frame: &RgbImage, conf: f32) -> Result<Vec<RawBox>> {
        (**self).forward(frame, conf)
    }

    fn summary(&self) {
        (**self).summary()
    }
}

pub mod yolov8;

pub use yolov8::{YOLOv8, YOLOv8Config};
