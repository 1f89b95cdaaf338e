// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! 显示窗口

use image::RgbImage;

use crate::error::Result;

/// 交互式显示界面
pub trait DisplaySurface {
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// 等待按键, `delay_ms <= 0` 时一直等待; 超时返回 `None`
    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<char>>;

    /// 可重复调用
    fn close(&mut self);
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).show(frame)
    }

    fn wait_key(&mut self, delay_ms: i32) -> Result<Option<char>> {
        (**self).wait_key(delay_ms)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

#[cfg(feature = "opencv")]
pub use highgui_window::HighGuiWindow;

#[cfg(feature = "opencv")]
mod highgui_window {
    use image::RgbImage;
    use log::debug;
    use opencv::highgui;

    use super::DisplaySurface;
    use crate::error::{DetectError, Result};
    use crate::input::capture::rgb_to_mat;

    /// OpenCV HighGUI 窗口
    pub struct HighGuiWindow {
        title: String,
        open: bool,
    }

    impl HighGuiWindow {
        pub fn open(title: &str) -> Result<Self> {
            highgui::named_window(title, highgui::WINDOW_AUTOSIZE)
                .map_err(|e| DetectError::open(format!("window `{}`", title), e))?;
            debug!("🪟 窗口已创建: {}", title);
            Ok(Self {
                title: title.to_string(),
                open: true,
            })
        }
    }

    impl DisplaySurface for HighGuiWindow {
        fn show(&mut self, frame: &RgbImage) -> Result<()> {
            let mat = rgb_to_mat(frame)?;
            highgui::imshow(&self.title, &mat)
                .map_err(|e| DetectError::write(format!("window `{}`", self.title), e))
        }

        fn wait_key(&mut self, delay_ms: i32) -> Result<Option<char>> {
            let key = highgui::wait_key(delay_ms)
                .map_err(|e| DetectError::write(format!("window `{}`", self.title), e))?;
            if key < 0 {
                return Ok(None);
            }
            Ok(char::from_u32((key & 0xFF) as u32))
        }

        fn close(&mut self) {
            if self.open {
                let _ = highgui::destroy_window(&self.title);
                self.open = false;
            }
        }
    }

    impl Drop for HighGuiWindow {
        fn drop(&mut self) {
            self.close();
        }
    }
}
