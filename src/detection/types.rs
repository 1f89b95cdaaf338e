// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use serde::{Deserialize, Serialize};

use super::taxonomy::VehicleTaxonomy;

/// 车辆检测结果 (Detection)
///
/// 由过滤器产生, 创建后不可修改; 坐标为整数像素, 满足 x1 < x2, y1 < y2。
/// 反序列化时同样校验这些约束
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DetectionRecord")]
pub struct Detection {
    class_id: u32,
    class_name: String,
    confidence: f32,
    bbox: [i32; 4],
}

impl Detection {
    pub(crate) fn new(class_id: u32, class_name: &str, confidence: f32, bbox: [i32; 4]) -> Self {
        Self {
            class_id,
            class_name: class_name.to_string(),
            confidence,
            bbox,
        }
    }

    pub fn class_id(&self) -> u32 {
        self.class_id
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// (x1, y1, x2, y2)
    pub fn bbox(&self) -> [i32; 4] {
        self.bbox
    }

    pub fn width(&self) -> i32 {
        self.bbox[2] - self.bbox[0]
    }

    pub fn height(&self) -> i32 {
        self.bbox[3] - self.bbox[1]
    }

    /// 标签文本, 如 `car: 0.87`
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.class_name, self.confidence)
    }
}

/// 未校验的 JSON 记录
#[derive(Deserialize)]
struct DetectionRecord {
    class_id: u32,
    class_name: String,
    confidence: f32,
    bbox: [i32; 4],
}

impl TryFrom<DetectionRecord> for Detection {
    type Error = String;

    fn try_from(record: DetectionRecord) -> Result<Self, Self::Error> {
        let expected = VehicleTaxonomy::coco()
            .name(record.class_id)
            .ok_or_else(|| format!("class {} is not a vehicle class", record.class_id))?;
        if expected != record.class_name {
            return Err(format!(
                "class {} is {}, not {}",
                record.class_id, expected, record.class_name
            ));
        }
        if !(0.0..=1.0).contains(&record.confidence) {
            return Err(format!("confidence {} out of [0, 1]", record.confidence));
        }
        let [x1, y1, x2, y2] = record.bbox;
        if x1 >= x2 || y1 >= y2 {
            return Err(format!("degenerate box {:?}", record.bbox));
        }
        Ok(Self::new(record.class_id, expected, record.confidence, record.bbox))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Detection, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn valid_record_deserializes() {
        let det = parse(r#"{"class_id":7,"class_name":"truck","confidence":0.6,"bbox":[1,2,30,40]}"#)
            .unwrap();
        assert_eq!(det.class_name(), "truck");
        assert_eq!(det.bbox(), [1, 2, 30, 40]);
    }

    #[test]
    fn records_breaking_invariants_are_rejected() {
        for json in [
            r#"{"class_id":0,"class_name":"person","confidence":0.9,"bbox":[0,0,10,10]}"#,
            r#"{"class_id":2,"class_name":"truck","confidence":0.9,"bbox":[0,0,10,10]}"#,
            r#"{"class_id":2,"class_name":"car","confidence":1.5,"bbox":[0,0,10,10]}"#,
            r#"{"class_id":2,"class_name":"car","confidence":0.9,"bbox":[10,0,10,10]}"#,
            r#"{"class_id":2,"class_name":"car","confidence":0.9,"bbox":[0,20,10,10]}"#,
        ] {
            assert!(parse(json).is_err(), "{json}");
        }
    }
}
