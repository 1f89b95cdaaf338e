// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use phf::phf_map;

/// COCO 数据集中的车辆类别
static COCO_VEHICLES: phf::Map<u32, &'static str> = phf_map! {
    2u32 => "car",        // 汽车
    3u32 => "motorcycle", // 摩托车
    5u32 => "bus",        // 公交车
    7u32 => "truck",      // 卡车
};

/// 车辆类别表 (只读)
///
/// 不在表中的类别 id 一律丢弃
#[derive(Clone, Copy)]
pub struct VehicleTaxonomy {
    classes: &'static phf::Map<u32, &'static str>,
}

impl VehicleTaxonomy {
    pub fn coco() -> Self {
        Self {
            classes: &COCO_VEHICLES,
        }
    }

    pub fn name(&self, class_id: u32) -> Option<&'static str> {
        self.classes.get(&class_id).copied()
    }

    pub fn contains(&self, class_id: u32) -> bool {
        self.classes.contains_key(&class_id)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// 按类别 id 升序
    pub fn entries(&self) -> Vec<(u32, &'static str)> {
        let mut entries: Vec<_> = self.classes.entries().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(k, _)| *k);
        entries
    }
}

impl Default for VehicleTaxonomy {
    fn default() -> Self {
        Self::coco()
    }
}

impl std::fmt::Debug for VehicleTaxonomy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}
