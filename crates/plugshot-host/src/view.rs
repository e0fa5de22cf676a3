//! Lifecycle wrapper around a plugin's `IPlugView`.

use std::ffi::CString;
use std::os::raw::c_void;

use tracing::{debug, warn};
use vst3_abi as abi;
use vst3_abi::{ComPtr, IPlugFrame, IPlugView, ViewRect};

use crate::error::HostError;
use crate::platform::Size;

/// Editor view with attach/detach bookkeeping. Detaching is idempotent and
/// always runs on drop, so a session can bail out at any point without
/// leaving the plugin attached to a dead window.
pub struct EditorView {
    view: ComPtr<IPlugView>,
    frame: Option<ComPtr<IPlugFrame>>,
    attached: bool,
}

impl EditorView {
    pub(crate) fn new(view: ComPtr<IPlugView>) -> Self {
        Self {
            view,
            frame: None,
            attached: false,
        }
    }

    pub fn raw(&self) -> *mut IPlugView {
        self.view.as_ptr()
    }

    /// Asks the editor for its current size. Before the view is attached
    /// this is the plugin's preferred editor size.
    pub fn size(&self) -> Option<Size> {
        let mut rect = ViewRect::default();
        let rc = unsafe { (self.view.vtbl().get_size)(self.view.as_ptr(), &mut rect) };
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "editor did not report a size");
            return None;
        }
        Size::from_rect(rect)
    }

    /// Hands the editor the host frame that will receive resize requests.
    pub fn set_frame(&mut self, frame: ComPtr<IPlugFrame>) {
        let rc = unsafe { (self.view.vtbl().set_frame)(self.view.as_ptr(), frame.as_ptr()) };
        if rc != abi::K_RESULT_OK {
            debug!(code = rc, "editor refused the plug frame");
        }
        // Keep our reference regardless; the plugin may have stored the
        // pointer even while returning an error code.
        self.frame = Some(frame);
    }

    /// Attaches the editor to a native parent handle of the given platform
    /// type, for example an `NSView` pointer on macOS.
    pub fn attach(&mut self, parent: *mut c_void, platform: &'static str) -> Result<(), HostError> {
        let platform_type = CString::new(platform).map_err(|_| HostError::ViewAttach { platform })?;

        let supported = unsafe {
            (self.view.vtbl().is_platform_type_supported)(
                self.view.as_ptr(),
                platform_type.as_ptr(),
            )
        };
        if supported != abi::K_RESULT_OK {
            warn!(platform, code = supported, "editor rejects the platform view type");
            return Err(HostError::ViewAttach { platform });
        }

        let rc = unsafe {
            (self.view.vtbl().attached)(self.view.as_ptr(), parent, platform_type.as_ptr())
        };
        if rc != abi::K_RESULT_OK {
            warn!(platform, code = rc, "editor failed to attach");
            return Err(HostError::ViewAttach { platform });
        }
        self.attached = true;
        debug!(platform, "editor attached");
        Ok(())
    }

    /// Detaches the editor and clears the host frame. Safe to call more
    /// than once.
    pub fn detach(&mut self) {
        if self.attached {
            let rc = unsafe { (self.view.vtbl().removed)(self.view.as_ptr()) };
            if rc != abi::K_RESULT_OK {
                debug!(code = rc, "editor reported an error while detaching");
            }
            self.attached = false;
        }
        if self.frame.take().is_some() {
            unsafe {
                (self.view.vtbl().set_frame)(self.view.as_ptr(), std::ptr::null_mut());
            }
        }
    }
}

impl Drop for EditorView {
    fn drop(&mut self) {
        self.detach();
    }
}
