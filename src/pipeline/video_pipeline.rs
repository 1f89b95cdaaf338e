// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 视频流状态机
//!
//! ```text
//! Opening → Streaming → (Draining | Cancelled | Failed) → Closed
//! ```
//!
//! `StreamSession::open` 对应 Opening, `StreamSession::close` 对应 Closed。
//! 会话析构时若尚未关闭会自动关闭, 所以任何退出路径都只清理一次。

use std::path::PathBuf;

use image::RgbImage;
use log::{error, info, warn};

use super::{valid_fps, MediaBackend, StreamReport, VehiclePipeline, VideoRequest};
use crate::detection::Detection;
use crate::error::{DetectError, Result};
use crate::input::FrameSource;
use crate::models::Model;
use crate::output::{fit_to, FrameSink, SinkSpec};
use crate::renderer::{DisplaySurface, LabelStyle, TextPainter};

/// 每帧轮询按键的等待时间
const KEY_POLL_MS: i32 = 1;

/// 循环中的状态
#[derive(Debug)]
pub enum StreamState {
    Streaming,
    /// 源已无更多帧
    Draining,
    /// 退出键或外部取消
    Cancelled,
    Failed(DetectError),
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamState::Streaming)
    }
}

enum SinkSlot<K> {
    None,
    /// 源未报告尺寸, 第一帧到达时再打开
    Pending { path: PathBuf, fps: f64 },
    Open { sink: K, spec: SinkSpec, written: u64 },
}

struct StreamSession<'b, B: MediaBackend> {
    backend: &'b B,
    source: B::Source,
    sink: SinkSlot<B::Sink>,
    window: Option<B::Window>,
    frame_count: u64,
    skipped: u64,
    consecutive_errors: u32,
    closed: bool,
}

impl<'b, B: MediaBackend> StreamSession<'b, B> {
    /// 打开帧源, 再按需打开写入端和窗口; 任一步失败时已打开的资源随会话析构释放
    fn open(backend: &'b B, request: &VideoRequest) -> Result<Self> {
        let source = backend.open_source(&request.source)?;
        let mut session = Self {
            backend,
            source,
            sink: SinkSlot::None,
            window: None,
            frame_count: 0,
            skipped: 0,
            consecutive_errors: 0,
            closed: false,
        };

        if let Some(path) = &request.output {
            let fps = match valid_fps(session.source.fps()) {
                Some(fps) => fps,
                None => {
                    let fps = request.options.effective_fallback_fps();
                    warn!("⚠️  视频源未报告帧率, 输出使用 {} fps", fps);
                    fps
                }
            };

            let (width, height) = session.source.dimensions();
            session.sink = if width > 0 && height > 0 {
                let spec = SinkSpec { fps, width, height };
                SinkSlot::Open {
                    sink: backend.open_sink(path, spec)?,
                    spec,
                    written: 0,
                }
            } else {
                SinkSlot::Pending {
                    path: path.clone(),
                    fps,
                }
            };
        }

        if request.display {
            session.window = Some(backend.open_window(&request.options.window_title)?);
        }

        Ok(session)
    }

    fn step<M, P, F>(
        &mut self,
        pipeline: &mut VehiclePipeline<M, P>,
        request: &VideoRequest,
        on_frame: &mut F,
    ) -> StreamState
    where
        M: Model,
        P: TextPainter,
        F: FnMut(u64, &[Detection]),
    {
        if request.cancel.is_cancelled() {
            return StreamState::Cancelled;
        }

        let result = match self.source.read_frame() {
            Ok(Some(frame)) => self.process(pipeline, request, frame, on_frame),
            Ok(None) => return StreamState::Draining,
            Err(e) => Err(e),
        };

        match result {
            Ok(state) => {
                self.consecutive_errors = 0;
                state
            }
            Err(e) if e.is_frame_local() => self.skip(e, request.options.max_consecutive_decode_errors),
            Err(e) => StreamState::Failed(e),
        }
    }

    fn process<M, P, F>(
        &mut self,
        pipeline: &mut VehiclePipeline<M, P>,
        request: &VideoRequest,
        mut frame: RgbImage,
        on_frame: &mut F,
    ) -> Result<StreamState>
    where
        M: Model,
        P: TextPainter,
        F: FnMut(u64, &[Detection]),
    {
        let detections = pipeline.detector.detect_frame(&frame)?;
        self.frame_count += 1;

        pipeline
            .annotator
            .annotate(&mut frame, &detections, LabelStyle::TextOnly);
        pipeline
            .annotator
            .draw_overlay(&mut frame, self.frame_count, detections.len());
        on_frame(self.frame_count, &detections);

        self.write(&frame)?;

        if let Some(window) = self.window.as_mut() {
            window.show(&frame)?;
            if window.wait_key(KEY_POLL_MS)? == Some(request.options.quit_key) {
                info!("⏹️  收到退出键");
                return Ok(StreamState::Cancelled);
            }
        }

        Ok(StreamState::Streaming)
    }

    fn skip(&mut self, e: DetectError, limit: u32) -> StreamState {
        self.skipped += 1;
        self.consecutive_errors += 1;
        warn!("⚠️  跳过无法解码的帧: {}", e);
        if limit > 0 && self.consecutive_errors >= limit {
            error!("❌ 连续 {} 帧解码失败, 停止处理", self.consecutive_errors);
            return StreamState::Failed(e);
        }
        StreamState::Streaming
    }

    fn write(&mut self, frame: &RgbImage) -> Result<()> {
        if let SinkSlot::Pending { path, fps } = &self.sink {
            let (width, height) = frame.dimensions();
            let spec = SinkSpec {
                fps: *fps,
                width,
                height,
            };
            let sink = self.backend.open_sink(path, spec)?;
            self.sink = SinkSlot::Open {
                sink,
                spec,
                written: 0,
            };
        }

        if let SinkSlot::Open {
            sink,
            spec,
            written,
        } = &mut self.sink
        {
            sink.write(&fit_to(frame, spec.dimensions()))?;
            *written += 1;
        }
        Ok(())
    }

    /// 释放帧源, 关闭写入端, 关闭窗口; 只执行一次
    fn close(&mut self) -> Option<DetectError> {
        if self.closed {
            return None;
        }
        self.closed = true;

        self.source.release();
        let mut finish_error = None;
        if let SinkSlot::Open { sink, .. } = &mut self.sink {
            if let Err(e) = sink.finish() {
                warn!("❌ 输出视频关闭失败: {}", e);
                finish_error = Some(e);
            }
        }
        if let Some(window) = self.window.as_mut() {
            window.close();
        }
        finish_error
    }

    fn report(&self, cancelled: bool, write_error: Option<DetectError>) -> StreamReport {
        StreamReport {
            frames: self.frame_count,
            skipped: self.skipped,
            wrote_output: matches!(self.sink, SinkSlot::Open { written, .. } if written > 0),
            cancelled,
            write_error,
        }
    }
}

impl<B: MediaBackend> Drop for StreamSession<'_, B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<M: Model, P: TextPainter> VehiclePipeline<M, P> {
    pub fn detect_video<B: MediaBackend>(
        &mut self,
        backend: &B,
        request: &VideoRequest,
    ) -> Result<StreamReport> {
        self.detect_video_with(backend, request, |_, _| {})
    }

    /// 处理视频流, 每帧检测完成后调用 `on_frame(帧序号, 检测结果)`
    ///
    /// 检测结果不在流程中累积, 需要时由回调收集
    pub fn detect_video_with<B, F>(
        &mut self,
        backend: &B,
        request: &VideoRequest,
        mut on_frame: F,
    ) -> Result<StreamReport>
    where
        B: MediaBackend,
        F: FnMut(u64, &[Detection]),
    {
        info!("🎬 开始处理视频: {}", request.source);
        let mut session = StreamSession::open(backend, request)?;

        let mut state = StreamState::Streaming;
        while !state.is_terminal() {
            state = session.step(self, request, &mut on_frame);
        }

        let finish_error = session.close();

        match state {
            StreamState::Failed(e) => {
                error!("❌ 视频处理失败 (已处理 {} 帧): {}", session.frame_count, e);
                Err(e)
            }
            state => {
                let report = session.report(matches!(state, StreamState::Cancelled), finish_error);
                info!(
                    "✅ 视频处理完成: {} 帧, 跳过 {} 帧{}",
                    report.frames,
                    report.skipped,
                    if report.cancelled { " (已取消)" } else { "" }
                );
                Ok(report)
            }
        }
    }
}
