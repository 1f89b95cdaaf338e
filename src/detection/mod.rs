// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

/// 检测系统 (Detection System)
///
/// - Taxonomy: COCO 类别 → 车辆类型
/// - Filter:   原始检测框 → 车辆检测结果 (纯函数, 无副作用)
/// - Detector: 推理 + 过滤
/// - Records:  检测结果 JSON 持久化
pub mod detector;
pub mod filter;
pub mod records;
pub mod taxonomy;
pub mod types;

pub use detector::Detector;
pub use filter::{count_by_class, filter_vehicles};
pub use records::DetectionLog;
pub use taxonomy::VehicleTaxonomy;
pub use types::Detection;
