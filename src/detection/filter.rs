// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 车辆类别过滤器
//!
//! 纯函数: (原始检测框, 类别表) → 车辆检测结果。
//! 置信度阈值已在推理后端应用, 这里不再过滤。

use std::collections::BTreeMap;

use super::taxonomy::VehicleTaxonomy;
use super::types::Detection;
use crate::models::RawBox;

/// 保留类别在表中的检测框, 顺序与输入一致
///
/// 坐标截断 (非四舍五入) 为整数像素; 截断后退化的框 (x1 >= x2 或 y1 >= y2)
/// 以及置信度不在 [0, 1] 内的框被丢弃
pub fn filter_vehicles(raw: &[RawBox], taxonomy: &VehicleTaxonomy) -> Vec<Detection> {
    raw.iter()
        .filter_map(|b| {
            let name = taxonomy.name(b.class_id)?;
            if !(0.0..=1.0).contains(&b.confidence) {
                return None;
            }
            let [x1, y1, x2, y2] = b.bbox.map(|v| v as i32);
            if x1 >= x2 || y1 >= y2 {
                return None;
            }
            Some(Detection::new(b.class_id, name, b.confidence, [x1, y1, x2, y2]))
        })
        .collect()
}

/// 按车辆类型计数
pub fn count_by_class(detections: &[Detection]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for d in detections {
        *counts.entry(d.class_name().to_string()).or_insert(0) += 1;
    }
    counts
}
