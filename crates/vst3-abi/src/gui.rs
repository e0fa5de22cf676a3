//! Editor view interfaces: `IPlugView` and the host-side `IPlugFrame`.

use core::ffi::{c_char, c_void};

use crate::base::{impl_interface, uid, FUnknownVtbl, TBool, Tresult};

/// `IPlugView::isPlatformTypeSupported` / `attached` type strings.
pub const PLATFORM_TYPE_NSVIEW: &str = "NSView";
pub const PLATFORM_TYPE_X11_WINDOW: &str = "X11EmbedWindowID";
pub const PLATFORM_TYPE_HWND: &str = "HWND";

/// The only view type `IEditController::createView` is required to know.
pub const VIEW_TYPE_EDITOR: &str = "editor";

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl ViewRect {
    pub const fn with_size(width: i32, height: i32) -> Self {
        Self {
            left: 0,
            top: 0,
            right: width,
            bottom: height,
        }
    }

    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

#[repr(C)]
pub struct IPlugViewVtbl {
    pub base: FUnknownVtbl,
    pub is_platform_type_supported:
        unsafe extern "system" fn(this: *mut IPlugView, platform_type: *const c_char) -> Tresult,
    pub attached: unsafe extern "system" fn(
        this: *mut IPlugView,
        parent: *mut c_void,
        platform_type: *const c_char,
    ) -> Tresult,
    pub removed: unsafe extern "system" fn(this: *mut IPlugView) -> Tresult,
    pub on_wheel: unsafe extern "system" fn(this: *mut IPlugView, distance: f32) -> Tresult,
    pub on_key_down: unsafe extern "system" fn(
        this: *mut IPlugView,
        key: i16,
        key_code: i16,
        modifiers: i16,
    ) -> Tresult,
    pub on_key_up: unsafe extern "system" fn(
        this: *mut IPlugView,
        key: i16,
        key_code: i16,
        modifiers: i16,
    ) -> Tresult,
    pub get_size: unsafe extern "system" fn(this: *mut IPlugView, size: *mut ViewRect) -> Tresult,
    pub on_size:
        unsafe extern "system" fn(this: *mut IPlugView, new_size: *const ViewRect) -> Tresult,
    pub on_focus: unsafe extern "system" fn(this: *mut IPlugView, state: TBool) -> Tresult,
    pub set_frame:
        unsafe extern "system" fn(this: *mut IPlugView, frame: *mut IPlugFrame) -> Tresult,
    pub can_resize: unsafe extern "system" fn(this: *mut IPlugView) -> Tresult,
    pub check_size_constraint:
        unsafe extern "system" fn(this: *mut IPlugView, rect: *mut ViewRect) -> Tresult,
}

#[repr(C)]
pub struct IPlugView {
    pub vtbl: *const IPlugViewVtbl,
}

impl_interface!(
    IPlugView,
    IPlugViewVtbl,
    uid(0x5BC32507, 0xD06049EA, 0xA6151B52, 0x2B755B29)
);

#[repr(C)]
pub struct IPlugFrameVtbl {
    pub base: FUnknownVtbl,
    pub resize_view: unsafe extern "system" fn(
        this: *mut IPlugFrame,
        view: *mut IPlugView,
        new_size: *mut ViewRect,
    ) -> Tresult,
}

#[repr(C)]
pub struct IPlugFrame {
    pub vtbl: *const IPlugFrameVtbl,
}

impl_interface!(
    IPlugFrame,
    IPlugFrameVtbl,
    uid(0x367FAF01, 0xAFA94693, 0x8D4DA2A0, 0xED0882A3)
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_rect_dimensions() {
        let rect = ViewRect {
            left: 10,
            top: 20,
            right: 110,
            bottom: 80,
        };
        assert_eq!(rect.width(), 100);
        assert_eq!(rect.height(), 60);
        assert_eq!(ViewRect::with_size(640, 480).width(), 640);
    }
}
