// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 检测框绘制 (Frame Annotator)
//!
//! 直接在帧缓冲上绘制: 检测框 → 标签背景 (可选) → 标签文字。
//! 按检测顺序绘制, 重叠时后绘制的覆盖先绘制的。

pub mod window;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detection::Detection;
use crate::settings::Settings;

pub use window::DisplaySurface;
#[cfg(feature = "opencv")]
pub use window::HighGuiWindow;

/// 标签背景与框顶之间的留白
const LABEL_PAD: i32 = 10;
/// 文字与标签背景边缘的距离
const TEXT_INSET: i32 = 5;

/// 文字测量与绘制
pub trait TextPainter {
    /// 返回 (宽, 高) 像素
    fn text_size(&self, scale: f32, text: &str) -> (u32, u32);

    /// (x, y) 为文字左上角
    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str);
}

/// 基于 TTF 字体的文字绘制
#[derive(Clone)]
pub struct FontPainter {
    font: FontArc,
}

impl FontPainter {
    pub fn new(font: FontArc) -> Self {
        Self { font }
    }
}

impl TextPainter for FontPainter {
    fn text_size(&self, scale: f32, text: &str) -> (u32, u32) {
        text_size(PxScale::from(scale), &self.font, text)
    }

    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        draw_text_mut(canvas, color, x, y, PxScale::from(scale), &self.font, text);
    }
}

/// 标签样式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelStyle {
    /// 填充背景 + 对比色文字 (图片)
    Filled,
    /// 仅文字, 与框同色 (视频, 降低每帧开销)
    TextOnly,
}

/// 绘制参数
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationStyle {
    pub box_color: Rgb<u8>,
    pub text_color: Rgb<u8>,
    pub thickness: u32,
    pub image_label_scale: f32,
    pub video_label_scale: f32,
    pub overlay_scale: f32,
    pub overlay_position: (i32, i32),
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for AnnotationStyle {
    fn from(s: &Settings) -> Self {
        Self {
            box_color: Rgb(s.box_color),
            text_color: Rgb(s.label_text_color),
            thickness: s.box_thickness.max(1),
            image_label_scale: s.image_label_scale,
            video_label_scale: s.video_label_scale,
            overlay_scale: s.overlay_scale,
            overlay_position: s.overlay_position,
        }
    }
}

/// 标签位置: 背景矩形 (已裁剪到帧内) 与文字左上角
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelPlacement {
    pub background: Option<Rect>,
    pub text: (i32, i32),
}

/// 计算标签位置
///
/// 优先放在框顶边之上; 框贴近帧顶部放不下时, 放在框内顶边处。
pub fn place_label(bbox: [i32; 4], text: (u32, u32), frame: (u32, u32)) -> LabelPlacement {
    let [x1, y1, _, _] = bbox;
    let (text_w, text_h) = (text.0 as i32, text.1 as i32);
    let label_h = text_h + LABEL_PAD;

    let top = if y1 - label_h >= 0 { y1 - label_h } else { y1 };
    let text_pos = (x1.max(0), top + TEXT_INSET);

    let left = x1.max(0);
    let right = (x1 + text_w).min(frame.0 as i32);
    let upper = top.max(0);
    let lower = (top + label_h).min(frame.1 as i32);
    let background = if right > left && lower > upper {
        Some(Rect::at(left, upper).of_size((right - left) as u32, (lower - upper) as u32))
    } else {
        None
    };

    LabelPlacement {
        background,
        text: text_pos,
    }
}

/// 帧标注器
pub struct Annotator<P = FontPainter> {
    painter: P,
    style: AnnotationStyle,
}

impl<P: TextPainter> Annotator<P> {
    pub fn new(painter: P, style: AnnotationStyle) -> Self {
        Self { painter, style }
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }

    /// 按顺序绘制所有检测结果
    pub fn annotate(&self, frame: &mut RgbImage, detections: &[Detection], label: LabelStyle) {
        for det in detections {
            self.draw_box(frame, det.bbox());
            self.draw_label(frame, det, label);
        }
    }

    /// 左上角的运行统计: `Frame: n | Vehicles: k`
    pub fn draw_overlay(&self, frame: &mut RgbImage, frame_count: u64, vehicles: usize) {
        let text = format!("Frame: {} | Vehicles: {}", frame_count, vehicles);
        let (x, y) = self.style.overlay_position;
        self.painter.draw_text(
            frame,
            self.style.box_color,
            x,
            y,
            self.style.overlay_scale,
            &text,
        );
    }

    fn draw_box(&self, frame: &mut RgbImage, bbox: [i32; 4]) {
        let [x1, y1, x2, y2] = bbox;
        for t in 0..self.style.thickness as i32 {
            let (l, u, r, b) = (x1 + t, y1 + t, x2 - t, y2 - t);
            if r < l || b < u {
                break;
            }
            let rect = Rect::at(l, u).of_size((r - l + 1) as u32, (b - u + 1) as u32);
            draw_hollow_rect_mut(frame, rect, self.style.box_color);
        }
    }

    fn draw_label(&self, frame: &mut RgbImage, det: &Detection, label: LabelStyle) {
        let text = det.label();
        let scale = match label {
            LabelStyle::Filled => self.style.image_label_scale,
            LabelStyle::TextOnly => self.style.video_label_scale,
        };
        let size = self.painter.text_size(scale, &text);
        let placement = place_label(det.bbox(), size, frame.dimensions());
        let (x, y) = placement.text;

        match label {
            LabelStyle::Filled => {
                if let Some(rect) = placement.background {
                    draw_filled_rect_mut(frame, rect, self.style.box_color);
                }
                self.painter
                    .draw_text(frame, self.style.text_color, x, y, scale, &text);
            }
            LabelStyle::TextOnly => {
                self.painter
                    .draw_text(frame, self.style.box_color, x, y, scale, &text);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{filter_vehicles, VehicleTaxonomy};
    use crate::models::RawBox;

    /// 每个字符 6x10 的实心块
    struct BlockPainter;

    impl TextPainter for BlockPainter {
        fn text_size(&self, _scale: f32, text: &str) -> (u32, u32) {
            (6 * text.chars().count() as u32, 10)
        }

        fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
            let (w, h) = self.text_size(scale, text);
            draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
        }
    }

    fn detections(raw: &[RawBox]) -> Vec<Detection> {
        filter_vehicles(raw, &VehicleTaxonomy::coco())
    }

    #[test]
    fn label_sits_above_box_when_there_is_room() {
        let p = place_label([40, 100, 200, 200], (60, 10), (640, 480));
        assert_eq!(p.background, Some(Rect::at(40, 80).of_size(60, 20)));
        assert_eq!(p.text, (40, 85));
    }

    #[test]
    fn label_moves_inside_box_at_top_edge() {
        let p = place_label([40, 0, 200, 200], (60, 10), (640, 480));
        assert_eq!(p.background, Some(Rect::at(40, 0).of_size(60, 20)));
        assert_eq!(p.text, (40, 5));
    }

    #[test]
    fn label_background_is_clipped_to_frame() {
        let p = place_label([600, 5, 639, 100], (80, 10), (640, 480));
        let bg = p.background.unwrap();
        assert_eq!(bg.left(), 600);
        assert_eq!(bg.right(), 639);
    }

    #[test]
    fn box_outline_is_drawn_with_stroke() {
        let annotator = Annotator::new(BlockPainter, AnnotationStyle::default());
        let mut frame = RgbImage::new(100, 100);
        let dets = detections(&[RawBox::new(2, 0.9, [10., 40., 50., 80.])]);
        annotator.annotate(&mut frame, &dets, LabelStyle::TextOnly);

        let green = Rgb([0, 255, 0]);
        assert_eq!(*frame.get_pixel(10, 60), green);
        assert_eq!(*frame.get_pixel(11, 60), green);
        assert_eq!(*frame.get_pixel(12, 60), Rgb([0, 0, 0]));
        assert_eq!(*frame.get_pixel(50, 60), green);
        assert_eq!(*frame.get_pixel(30, 60), Rgb([0, 0, 0]));
    }

    #[test]
    fn filled_label_uses_contrasting_text() {
        let annotator = Annotator::new(BlockPainter, AnnotationStyle::default());
        let mut frame = RgbImage::new(200, 200);
        let dets = detections(&[RawBox::new(2, 0.9, [10., 60., 150., 150.])]);
        annotator.annotate(&mut frame, &dets, LabelStyle::Filled);

        // 背景: y 40..60, 文字: y 45..55
        assert_eq!(*frame.get_pixel(12, 42), Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(12, 50), Rgb([0, 0, 0]));
    }

    #[test]
    fn later_detections_draw_over_earlier_ones() {
        let style = AnnotationStyle {
            thickness: 1,
            ..AnnotationStyle::default()
        };
        let annotator = Annotator::new(BlockPainter, style);
        let mut frame = RgbImage::from_pixel(120, 120, Rgb([255, 255, 255]));
        let dets = detections(&[
            RawBox::new(2, 0.9, [20., 60., 100., 100.]),
            RawBox::new(7, 0.8, [20., 80., 100., 110.]),
        ]);
        annotator.annotate(&mut frame, &dets, LabelStyle::Filled);
        // 第二个框的标签背景覆盖在第一个框的内部
        assert_eq!(*frame.get_pixel(60, 62), Rgb([0, 255, 0]));
    }

    #[test]
    fn overlay_is_drawn_at_fixed_position() {
        let annotator = Annotator::new(BlockPainter, AnnotationStyle::default());
        let mut frame = RgbImage::new(400, 100);
        annotator.draw_overlay(&mut frame, 3, 2);
        assert_eq!(*frame.get_pixel(10, 10), Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(9, 9), Rgb([0, 0, 0]));
    }
}
