// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 车辆检测 (YOLOv8)
//!
//! ```text
//! vehicles -i street.jpg -o street_detected.jpg
//! vehicles -i traffic.mp4 -v -o traffic_detected.mp4 --no-show
//! vehicles -i 0 -v                      # 摄像头, 按 q 退出
//! vehicles -i photos/ --batch -o out/
//! ```

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info, warn};
use yolov8_vehicles::assets;
use yolov8_vehicles::renderer::{AnnotationStyle, DisplaySurface};
use yolov8_vehicles::{
    Annotator, Args, DetectionLog, Detector, FontPainter, Settings, VehiclePipeline, YOLOv8,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const VIDEO_FEATURE_HINT: &str =
    "video mode needs OpenCV; rebuild with `cargo build --release --features opencv`";

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(args: &Args) -> Result<()> {
    if args.video && !cfg!(feature = "opencv") {
        bail!(VIDEO_FEATURE_HINT);
    }

    let settings = match &args.settings {
        Some(path) => {
            let settings = Settings::load(path);
            settings.print_summary();
            settings
        }
        None => Settings::default(),
    };

    let config = args.detector_config()?;
    info!(
        "🚀 车辆检测启动: 模型 {}, 置信度阈值 {:.2}",
        config.model_identifier(),
        config.confidence_threshold()
    );
    let detector = Detector::load(config, &settings, args.weights.as_deref())?;

    let font_path = args.font.as_deref().or(settings.font_path.as_deref());
    let font = assets::load_font(font_path).context("label font unavailable")?;
    let annotator = Annotator::new(FontPainter::new(font), AnnotationStyle::from(&settings));
    let mut pipeline = VehiclePipeline::new(detector, annotator);

    if args.batch {
        run_batch(&mut pipeline, args)
    } else if args.video {
        run_video(&mut pipeline, args, &settings)
    } else {
        run_image(&mut pipeline, args, &settings)
    }
}

fn run_image(pipeline: &mut VehiclePipeline<YOLOv8>, args: &Args, settings: &Settings) -> Result<()> {
    let input = Path::new(&args.input);
    let mut window = open_window(args, settings);
    let display = window
        .as_mut()
        .map(|w| &mut **w as &mut dyn DisplaySurface);
    let result = pipeline.detect_image(input, args.output.as_deref(), display)?;

    if let Some(path) = &args.save_json {
        DetectionLog::new(input, pipeline.detector(), &result.detections).save(path)?;
        info!("📝 检测记录已保存: {}", path.display());
    }
    if let Some(e) = result.write_error {
        return Err(e).context("annotated image was not saved");
    }
    Ok(())
}

fn run_batch(pipeline: &mut VehiclePipeline<YOLOv8>, args: &Args) -> Result<()> {
    let input = Path::new(&args.input);
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| input.join("detected"));
    let report = pipeline.detect_batch(input, &output)?;

    for entry in &report.entries {
        info!(
            "   {} → {} 辆车",
            entry.source.display(),
            entry.detections.len()
        );
    }

    if let Some(path) = &args.save_json {
        let detector = pipeline.detector();
        let logs: Vec<DetectionLog> = report
            .entries
            .iter()
            .map(|entry| DetectionLog::new(&entry.source, detector, &entry.detections))
            .collect();
        let file = File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &logs)
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!("📝 检测记录已保存: {}", path.display());
    }

    if !report.failures.is_empty() {
        for (path, e) in &report.failures {
            error!("   {}: {}", path.display(), e);
        }
        bail!(
            "{} of {} images failed",
            report.failures.len(),
            report.failures.len() + report.entries.len()
        );
    }
    Ok(())
}

#[cfg(feature = "opencv")]
fn run_video(pipeline: &mut VehiclePipeline<YOLOv8>, args: &Args, settings: &Settings) -> Result<()> {
    use std::io::Write;

    use yolov8_vehicles::input::InputSource;
    use yolov8_vehicles::pipeline::{CancelFlag, OpenCvBackend, VideoOptions};
    use yolov8_vehicles::{Detection, VideoRequest};

    #[derive(serde::Serialize)]
    struct FrameRecord<'a> {
        frame: u64,
        detections: &'a [Detection],
    }

    let cancel = CancelFlag::new();
    let handle = cancel.clone();
    ctrlc::set_handler(move || handle.cancel()).context("cannot install Ctrl-C handler")?;

    let mut request = VideoRequest::new(InputSource::parse(&args.input))
        .with_display(args.show())
        .with_options(VideoOptions::from(settings))
        .with_cancel(cancel);
    if let Some(path) = &args.output {
        request = request.with_output(path);
    }

    // JSON Lines, 每帧一行
    let mut records = match &args.save_json {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("cannot create {}", path.display()))?,
        )),
        None => None,
    };
    let mut record_error = None;

    let report = pipeline.detect_video_with(&OpenCvBackend, &request, |frame, detections| {
        let Some(out) = records.as_mut() else {
            return;
        };
        if record_error.is_some() {
            return;
        }
        let written = serde_json::to_writer(&mut *out, &FrameRecord { frame, detections })
            .map_err(std::io::Error::from)
            .and_then(|_| writeln!(out));
        if let Err(e) = written {
            record_error = Some(e);
        }
    })?;

    if let Some(mut out) = records {
        out.flush().context("cannot flush detection log")?;
    }
    if let Some(e) = record_error {
        return Err(e).context("detection log is incomplete");
    }

    info!(
        "📊 共处理 {} 帧, 跳过 {} 帧, 输出视频: {}",
        report.frames,
        report.skipped,
        if report.wrote_output { "是" } else { "否" }
    );
    if let Some(e) = report.write_error {
        return Err(e).context("output video was not finalized");
    }
    Ok(())
}

#[cfg(not(feature = "opencv"))]
fn run_video(_pipeline: &mut VehiclePipeline<YOLOv8>, _args: &Args, _settings: &Settings) -> Result<()> {
    bail!(VIDEO_FEATURE_HINT)
}

#[cfg(feature = "opencv")]
fn open_window(args: &Args, settings: &Settings) -> Option<Box<dyn DisplaySurface>> {
    use yolov8_vehicles::renderer::HighGuiWindow;

    if !args.show() {
        return None;
    }
    match HighGuiWindow::open(&settings.window_title) {
        Ok(window) => Some(Box::new(window)),
        Err(e) => {
            warn!("⚠️  无法打开显示窗口: {}", e);
            None
        }
    }
}

#[cfg(not(feature = "opencv"))]
fn open_window(args: &Args, _settings: &Settings) -> Option<Box<dyn DisplaySurface>> {
    if args.show() {
        warn!("⚠️  未启用 opencv feature, 跳过显示 (使用 --no-show 关闭此提示)");
    }
    None
}
