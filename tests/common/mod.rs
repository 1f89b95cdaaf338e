// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 测试替身: 预设结果的模型、方块文字、可记录调用的视频后端
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use yolov8_vehicles::input::FrameSource;
use yolov8_vehicles::output::{FrameSink, SinkSpec};
use yolov8_vehicles::{
    AnnotationStyle, Annotator, DetectError, Detector, DetectorConfig, DisplaySurface,
    InputSource, MediaBackend, Model, ModelKind, RawBox, Result, TextPainter, VehiclePipeline,
};

/// 每次推理返回同一组框, 按阈值过滤
#[derive(Debug, Default)]
pub struct FakeModel {
    pub boxes: Vec<RawBox>,
    pub calls: usize,
    /// 第 n 次调用 (从 1 开始) 返回推理错误
    pub fail_on_call: Option<usize>,
    /// 非空时第 n 次调用返回 `schedule[(n - 1) % len]`, 忽略 `boxes`
    pub schedule: Vec<Vec<RawBox>>,
}

impl FakeModel {
    pub fn new(boxes: Vec<RawBox>) -> Self {
        Self {
            boxes,
            ..Self::default()
        }
    }

    pub fn scheduled(schedule: Vec<Vec<RawBox>>) -> Self {
        Self {
            schedule,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }
}

impl Model for FakeModel {
    fn forward(&mut self, _frame: &RgbImage, conf: f32) -> Result<Vec<RawBox>> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(DetectError::adapter("session crashed"));
        }
        let boxes = if self.schedule.is_empty() {
            &self.boxes
        } else {
            &self.schedule[(self.calls - 1) % self.schedule.len()]
        };
        Ok(boxes
            .iter()
            .filter(|b| b.confidence >= conf)
            .copied()
            .collect())
    }
}

/// 每个字符 6x10 的实心块
pub struct BlockPainter;

impl TextPainter for BlockPainter {
    fn text_size(&self, _scale: f32, text: &str) -> (u32, u32) {
        (6 * text.chars().count() as u32, 10)
    }

    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        let (w, h) = self.text_size(scale, text);
        draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(w, h), color);
    }
}

/// 方块绘制, 同时按顺序记录每次绘制的文字
#[derive(Clone, Default)]
pub struct RecordingPainter {
    pub texts: Rc<RefCell<Vec<String>>>,
}

impl RecordingPainter {
    /// 记录中的 `Frame: ...` 统计行
    pub fn overlays(&self) -> Vec<String> {
        self.texts
            .borrow()
            .iter()
            .filter(|t| t.starts_with("Frame: "))
            .cloned()
            .collect()
    }
}

impl TextPainter for RecordingPainter {
    fn text_size(&self, scale: f32, text: &str) -> (u32, u32) {
        BlockPainter.text_size(scale, text)
    }

    fn draw_text(&self, canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: f32, text: &str) {
        self.texts.borrow_mut().push(text.to_string());
        BlockPainter.draw_text(canvas, color, x, y, scale, text);
    }
}

pub fn detector(model: FakeModel, conf: f32) -> Detector<FakeModel> {
    let config = DetectorConfig::new(ModelKind::Nano, conf).unwrap();
    Detector::new(config, model)
}

pub fn pipeline(model: FakeModel, conf: f32) -> VehiclePipeline<FakeModel, BlockPainter> {
    VehiclePipeline::new(
        detector(model, conf),
        Annotator::new(BlockPainter, AnnotationStyle::default()),
    )
}

pub fn recording_pipeline(
    model: FakeModel,
    conf: f32,
) -> (VehiclePipeline<FakeModel, RecordingPainter>, RecordingPainter) {
    let painter = RecordingPainter::default();
    let pipeline = VehiclePipeline::new(
        detector(model, conf),
        Annotator::new(painter.clone(), AnnotationStyle::default()),
    );
    (pipeline, painter)
}

pub fn car(conf: f32, bbox: [f32; 4]) -> RawBox {
    RawBox::new(2, conf, bbox)
}

pub fn truck(conf: f32, bbox: [f32; 4]) -> RawBox {
    RawBox::new(7, conf, bbox)
}

pub fn person(conf: f32, bbox: [f32; 4]) -> RawBox {
    RawBox::new(0, conf, bbox)
}

pub fn gray_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([90, 90, 90]))
}

pub fn write_image(path: &Path, width: u32, height: u32) {
    gray_image(width, height).save(path).unwrap();
}

/// 记录所有后端调用
#[derive(Debug, Default)]
pub struct Journal {
    pub sources_opened: usize,
    pub sources_released: usize,
    pub frames_read: usize,
    pub sink_specs: Vec<SinkSpec>,
    pub written_sizes: Vec<(u32, u32)>,
    pub sinks_finished: usize,
    pub windows_opened: usize,
    pub windows_closed: usize,
    pub frames_shown: usize,
    pub key_waits: Vec<i32>,
}

impl Journal {
    pub fn frames_written(&self) -> usize {
        self.written_sizes.len()
    }
}

#[derive(Clone)]
pub enum Scripted {
    Frame(RgbImage),
    Corrupt,
}

pub fn frames(count: usize, width: u32, height: u32) -> Vec<Scripted> {
    (0..count)
        .map(|_| Scripted::Frame(gray_image(width, height)))
        .collect()
}

pub struct FakeBackend {
    pub journal: Rc<RefCell<Journal>>,
    pub script: Vec<Scripted>,
    pub fps: f64,
    pub dimensions: (u32, u32),
    pub fail_open: bool,
    pub fail_sink: bool,
    /// 第 n 次写入 (从 1 开始) 失败
    pub fail_write_at: Option<usize>,
    pub fail_finish: bool,
    /// 第 n 次显示后 `wait_key` 返回的按键
    pub keys: Vec<Option<char>>,
}

impl FakeBackend {
    pub fn new(script: Vec<Scripted>) -> Self {
        let dimensions = script
            .iter()
            .find_map(|s| match s {
                Scripted::Frame(f) => Some(f.dimensions()),
                Scripted::Corrupt => None,
            })
            .unwrap_or((0, 0));
        Self {
            journal: Rc::default(),
            script,
            fps: 25.0,
            dimensions,
            fail_open: false,
            fail_sink: false,
            fail_write_at: None,
            fail_finish: false,
            keys: Vec::new(),
        }
    }

    pub fn press_at(mut self, shown: usize, key: char) -> Self {
        if self.keys.len() < shown {
            self.keys.resize(shown, None);
        }
        self.keys[shown - 1] = Some(key);
        self
    }

    pub fn journal(&self) -> std::cell::Ref<'_, Journal> {
        self.journal.borrow()
    }
}

pub struct FakeSource {
    journal: Rc<RefCell<Journal>>,
    frames: VecDeque<Scripted>,
    fps: f64,
    dimensions: (u32, u32),
}

impl FrameSource for FakeSource {
    fn read_frame(&mut self) -> Result<Option<RgbImage>> {
        self.journal.borrow_mut().frames_read += 1;
        match self.frames.pop_front() {
            Some(Scripted::Frame(frame)) => Ok(Some(frame)),
            Some(Scripted::Corrupt) => Err(DetectError::decode("frame", "corrupt packet")),
            None => Ok(None),
        }
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn dimensions(&self) -> (u32, u32) {
        self.dimensions
    }

    fn release(&mut self) {
        self.journal.borrow_mut().sources_released += 1;
    }
}

pub struct FakeSink {
    journal: Rc<RefCell<Journal>>,
    attempts: usize,
    fail_write_at: Option<usize>,
    fail_finish: bool,
}

impl FrameSink for FakeSink {
    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        self.attempts += 1;
        if self.fail_write_at == Some(self.attempts) {
            return Err(DetectError::write("out.mp4", "disk full"));
        }
        self.journal
            .borrow_mut()
            .written_sizes
            .push(frame.dimensions());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.journal.borrow_mut().sinks_finished += 1;
        if self.fail_finish {
            return Err(DetectError::write("out.mp4", "flush failed"));
        }
        Ok(())
    }
}

pub struct FakeWindow {
    journal: Rc<RefCell<Journal>>,
    keys: Vec<Option<char>>,
}

impl FakeWindow {
    pub fn new(journal: Rc<RefCell<Journal>>, keys: Vec<Option<char>>) -> Self {
        Self { journal, keys }
    }
}

impl DisplaySurface for FakeWindow {
    fn show(&mut self, _frame: &RgbImage) -> Result<()> {
        self.journal.borrow_mut().frames_shown += 1;
        Ok(())
    }

    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<char>> {
        let mut journal = self.journal.borrow_mut();
        journal.key_waits.push(delay_ms);
        let shown = journal.frames_shown;
        Ok(self
            .keys
            .get(shown.wrapping_sub(1))
            .copied()
            .flatten())
    }

    fn close(&mut self) {
        self.journal.borrow_mut().windows_closed += 1;
    }
}

impl MediaBackend for FakeBackend {
    type Source = FakeSource;
    type Sink = FakeSink;
    type Window = FakeWindow;

    fn open_source(&self, source: &InputSource) -> Result<FakeSource> {
        if self.fail_open {
            return Err(DetectError::open(source, "device unavailable"));
        }
        self.journal.borrow_mut().sources_opened += 1;
        Ok(FakeSource {
            journal: self.journal.clone(),
            frames: self.script.iter().cloned().collect(),
            fps: self.fps,
            dimensions: self.dimensions,
        })
    }

    fn open_sink(&self, path: &Path, spec: SinkSpec) -> Result<FakeSink> {
        if self.fail_sink {
            return Err(DetectError::write(path.display(), "codec unavailable"));
        }
        self.journal.borrow_mut().sink_specs.push(spec);
        Ok(FakeSink {
            journal: self.journal.clone(),
            attempts: 0,
            fail_write_at: self.fail_write_at,
            fail_finish: self.fail_finish,
        })
    }

    fn open_window(&self, _title: &str) -> Result<FakeWindow> {
        self.journal.borrow_mut().windows_opened += 1;
        Ok(FakeWindow::new(self.journal.clone(), self.keys.clone()))
    }
}
