//! Native window plumbing shared by the hosting paths.
//!
//! Everything genuinely platform-specific lives in an OS backend with a
//! common surface: `PlatformWindow`, `ResizeHandle`, `pump_events`,
//! `visible_screen_size` and `capture_window`. The non-macOS backend is a
//! stub that refuses to open windows, which keeps module loading and class
//! resolution usable on any OS.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use vst3_abi::ViewRect;

/// Editor size the runner path falls back to when a plugin will not report
/// one.
pub const RUNNER_FALLBACK_SIZE: Size = Size {
    width: 800,
    height: 600,
};

/// Largest share of the visible screen frame an editor window may take.
pub const MAX_SCREEN_FRACTION: f64 = 0.8;

/// Content size in logical pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Converts an editor rect, rejecting empty and negative extents.
    pub fn from_rect(rect: ViewRect) -> Option<Self> {
        let (width, height) = (rect.width(), rect.height());
        if width <= 0 || height <= 0 {
            return None;
        }
        Some(Self::new(width as u32, height as u32))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Clamps `size` against the visible screen frame, when one is known.
pub fn constrain_to_screen(size: Size, screen: Option<Size>) -> Size {
    let Some(screen) = screen else {
        return size;
    };
    let max_width = (screen.width as f64 * MAX_SCREEN_FRACTION) as u32;
    let max_height = (screen.height as f64 * MAX_SCREEN_FRACTION) as u32;
    Size::new(
        size.width.min(max_width.max(1)),
        size.height.min(max_height.max(1)),
    )
}

static OPEN_WINDOWS: AtomicUsize = AtomicUsize::new(0);

/// Number of native editor windows currently open. Teardown tests read
/// this back to zero.
pub fn open_window_count() -> usize {
    OPEN_WINDOWS.load(Ordering::Acquire)
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn register_window() {
    OPEN_WINDOWS.fetch_add(1, Ordering::AcqRel);
}

#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn unregister_window() {
    OPEN_WINDOWS.fetch_sub(1, Ordering::AcqRel);
}

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::{capture_window, pump_events, visible_screen_size, PlatformWindow, ResizeHandle};

#[cfg(not(target_os = "macos"))]
mod stub;
#[cfg(not(target_os = "macos"))]
pub use stub::{capture_window, pump_events, visible_screen_size, PlatformWindow, ResizeHandle};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn size_formats_as_width_by_height() {
        assert_eq!(Size::new(1024, 768).to_string(), "1024x768");
    }

    #[test]
    fn from_rect_rejects_empty_and_negative_extents() {
        assert_eq!(Size::from_rect(ViewRect::with_size(600, 400)), Some(Size::new(600, 400)));
        assert_eq!(Size::from_rect(ViewRect::with_size(0, 400)), None);
        assert_eq!(Size::from_rect(ViewRect::with_size(600, -1)), None);
    }

    #[test]
    fn constrain_passes_through_without_a_screen() {
        let size = Size::new(5000, 5000);
        assert_eq!(constrain_to_screen(size, None), size);
    }

    #[test]
    fn constrain_clamps_to_the_screen_fraction() {
        let screen = Some(Size::new(2000, 1000));
        assert_eq!(
            constrain_to_screen(Size::new(5000, 5000), screen),
            Size::new(1600, 800)
        );
        assert_eq!(
            constrain_to_screen(Size::new(640, 480), screen),
            Size::new(640, 480)
        );
    }

    #[test]
    fn constrain_never_collapses_to_zero() {
        let screen = Some(Size::new(1, 1));
        assert_eq!(
            constrain_to_screen(Size::new(300, 200), screen),
            Size::new(1, 1)
        );
    }
}
