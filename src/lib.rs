// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod assets; // 模型权重与字体定位
pub mod config; // 命令行参数与检测器配置
pub mod detection; // 车辆过滤与检测结果
pub mod error; // 错误分类
pub mod input; // 视频输入系统
pub mod models; // 模型接口与具体实现
pub mod ort_backend;
pub mod output; // 输出: 图片/视频写出
pub mod pipeline; // 图片/视频流水线
pub mod renderer; // 检测框绘制与显示窗口
pub mod settings; // JSON 设置文件

pub use crate::config::{Args, DetectorConfig, ModelKind};
pub use crate::detection::{Detection, DetectionLog, Detector, VehicleTaxonomy};
pub use crate::error::{DetectError, Result};
pub use crate::input::InputSource;
pub use crate::models::{Model, RawBox, YOLOv8, YOLOv8Config};
pub use crate::pipeline::{
    BatchReport, CancelFlag, ImageDetection, MediaBackend, StreamReport, VehiclePipeline,
    VideoOptions, VideoRequest,
};
pub use crate::renderer::{AnnotationStyle, Annotator, DisplaySurface, FontPainter, LabelStyle, TextPainter};
pub use crate::settings::Settings;

/// 类别无关的 NMS, 结果按置信度降序
pub fn non_max_suppression(xs: &mut Vec<RawBox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = xs[prev_index].iou(&xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
