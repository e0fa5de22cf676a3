//! Backend for platforms without native editor hosting. Window creation
//! and capture refuse outright; everything else is a no-op so the session
//! code compiles unchanged.

use std::ffi::c_void;
use std::time::Duration;

use vst3_abi::IPlugView;

use super::Size;
use crate::error::HostError;
use crate::snapshot::RgbaImage;

pub struct PlatformWindow(());

impl PlatformWindow {
    pub fn create(_title: &str, _content_size: Size) -> Result<Self, HostError> {
        Err(HostError::PlatformUnsupported)
    }

    pub fn content_parent(&self) -> *mut c_void {
        std::ptr::null_mut()
    }

    pub fn present(&self) {}

    pub fn resize_content(&self, _size: Size) {}

    pub fn resize_handle(&self) -> ResizeHandle {
        ResizeHandle
    }

    pub fn hide(&self) {}

    pub fn close(&mut self) {}
}

#[derive(Clone)]
pub struct ResizeHandle;

impl ResizeHandle {
    pub fn request_resize(&self, _view: *mut IPlugView, _size: Size) {}
}

pub fn pump_events(_duration: Duration) {}

pub fn visible_screen_size() -> Option<Size> {
    None
}

pub fn capture_window(_window: &PlatformWindow, _warmup: Duration) -> Result<RgbaImage, HostError> {
    Err(HostError::PlatformUnsupported)
}
