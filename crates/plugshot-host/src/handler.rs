//! Host-side callback objects handed to the plugin.
//!
//! The screenshot host never persists edits, so the component handler only
//! acknowledges whatever the controller reports. The plug frame forwards
//! editor resize requests to the session that owns the window.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;
use vst3_abi as abi;
use vst3_abi::{
    iid_eq, ComPtr, FUnknown, FUnknownVtbl, IComponentHandler, IComponentHandlerVtbl, IPlugFrame,
    IPlugFrameVtbl, IPlugView, Interface, ParamID, ParamValue, Tresult, ViewRect, TUID,
};

/// Component handler that accepts every edit notification without acting
/// on it.
#[repr(C)]
pub struct AckHandler {
    vtbl: *const IComponentHandlerVtbl,
    refs: AtomicU32,
}

static ACK_HANDLER_VTBL: IComponentHandlerVtbl = IComponentHandlerVtbl {
    base: FUnknownVtbl {
        query_interface: handler_query_interface,
        add_ref: handler_add_ref,
        release: handler_release,
    },
    begin_edit: handler_begin_edit,
    perform_edit: handler_perform_edit,
    end_edit: handler_end_edit,
    restart_component: handler_restart_component,
};

impl AckHandler {
    pub fn create() -> ComPtr<IComponentHandler> {
        let raw = Box::into_raw(Box::new(AckHandler {
            vtbl: &ACK_HANDLER_VTBL,
            refs: AtomicU32::new(1),
        }));
        unsafe { ComPtr::from_raw(raw.cast()) }.expect("box pointer is never null")
    }
}

unsafe extern "system" fn handler_query_interface(
    this: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    query_counted(this, iid, obj, &[&FUnknown::IID, &IComponentHandler::IID])
}

unsafe extern "system" fn handler_add_ref(this: *mut c_void) -> u32 {
    add_ref_counted(&(*this.cast::<AckHandler>()).refs)
}

unsafe extern "system" fn handler_release(this: *mut c_void) -> u32 {
    release_counted::<AckHandler>(this)
}

unsafe extern "system" fn handler_begin_edit(
    _this: *mut IComponentHandler,
    id: ParamID,
) -> Tresult {
    debug!(param = id, "controller began edit");
    abi::K_RESULT_OK
}

unsafe extern "system" fn handler_perform_edit(
    _this: *mut IComponentHandler,
    id: ParamID,
    value_normalized: ParamValue,
) -> Tresult {
    debug!(param = id, value = value_normalized, "controller performed edit");
    abi::K_RESULT_OK
}

unsafe extern "system" fn handler_end_edit(_this: *mut IComponentHandler, id: ParamID) -> Tresult {
    debug!(param = id, "controller ended edit");
    abi::K_RESULT_OK
}

unsafe extern "system" fn handler_restart_component(
    _this: *mut IComponentHandler,
    flags: i32,
) -> Tresult {
    debug!(flags, "controller requested component restart");
    abi::K_RESULT_OK
}

type ResizeCallback = Box<dyn Fn(*mut IPlugView, ViewRect) + Send + Sync>;

/// `IPlugFrame` given to the editor view so resize requests reach the
/// session window instead of being dropped.
#[repr(C)]
pub struct PlugFrame {
    vtbl: *const IPlugFrameVtbl,
    refs: AtomicU32,
    on_resize: ResizeCallback,
}

static PLUG_FRAME_VTBL: IPlugFrameVtbl = IPlugFrameVtbl {
    base: FUnknownVtbl {
        query_interface: frame_query_interface,
        add_ref: frame_add_ref,
        release: frame_release,
    },
    resize_view: frame_resize_view,
};

impl PlugFrame {
    pub fn create(on_resize: ResizeCallback) -> ComPtr<IPlugFrame> {
        let raw = Box::into_raw(Box::new(PlugFrame {
            vtbl: &PLUG_FRAME_VTBL,
            refs: AtomicU32::new(1),
            on_resize,
        }));
        unsafe { ComPtr::from_raw(raw.cast()) }.expect("box pointer is never null")
    }
}

unsafe extern "system" fn frame_query_interface(
    this: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    query_counted(this, iid, obj, &[&FUnknown::IID, &IPlugFrame::IID])
}

unsafe extern "system" fn frame_add_ref(this: *mut c_void) -> u32 {
    add_ref_counted(&(*this.cast::<PlugFrame>()).refs)
}

unsafe extern "system" fn frame_release(this: *mut c_void) -> u32 {
    release_counted::<PlugFrame>(this)
}

unsafe extern "system" fn frame_resize_view(
    this: *mut IPlugFrame,
    view: *mut IPlugView,
    new_size: *mut ViewRect,
) -> Tresult {
    if new_size.is_null() {
        return abi::K_INVALID_ARGUMENT;
    }
    let rect = *new_size;
    debug!(
        width = rect.width(),
        height = rect.height(),
        "editor requested resize"
    );
    let frame = &*this.cast::<PlugFrame>();
    (frame.on_resize)(view, rect);
    abi::K_RESULT_OK
}

unsafe fn query_counted(
    this: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
    supported: &[&TUID],
) -> Tresult {
    if obj.is_null() || iid.is_null() {
        return abi::K_INVALID_ARGUMENT;
    }
    let requested = &*iid;
    if supported.iter().any(|iid| iid_eq(requested, iid)) {
        add_ref_counted(&(*this.cast::<CountedHeader>()).refs);
        *obj = this;
        abi::K_RESULT_OK
    } else {
        *obj = std::ptr::null_mut();
        abi::K_NO_INTERFACE
    }
}

fn add_ref_counted(refs: &AtomicU32) -> u32 {
    refs.fetch_add(1, Ordering::AcqRel) + 1
}

unsafe fn release_counted<T>(this: *mut c_void) -> u32 {
    let left = {
        let header = &*this.cast::<CountedHeader>();
        header.refs.fetch_sub(1, Ordering::AcqRel) - 1
    };
    if left == 0 {
        drop(Box::from_raw(this.cast::<T>()));
    }
    left
}

/// Prefix shared by every counted object in this module: vtable pointer
/// first, reference count second.
#[repr(C)]
struct CountedHeader {
    vtbl: *const c_void,
    refs: AtomicU32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn refcount_probe<T: Interface>(ptr: &ComPtr<T>) -> u32 {
        unsafe {
            let unknown = ptr.as_ptr().cast::<FUnknown>();
            ((*(*unknown).vtbl).add_ref)(unknown.cast());
            ((*(*unknown).vtbl).release)(unknown.cast())
        }
    }

    #[test]
    fn handler_acknowledges_every_notification() {
        let handler = AckHandler::create();
        unsafe {
            let this = handler.as_ptr();
            assert_eq!((handler.vtbl().begin_edit)(this, 7), abi::K_RESULT_OK);
            assert_eq!((handler.vtbl().perform_edit)(this, 7, 0.25), abi::K_RESULT_OK);
            assert_eq!((handler.vtbl().end_edit)(this, 7), abi::K_RESULT_OK);
            assert_eq!((handler.vtbl().restart_component)(this, 1), abi::K_RESULT_OK);
        }
    }

    #[test]
    fn handler_refcount_follows_clones() {
        let handler = AckHandler::create();
        assert_eq!(refcount_probe(&handler), 1);
        let clone = handler.clone();
        assert_eq!(refcount_probe(&handler), 2);
        drop(clone);
        assert_eq!(refcount_probe(&handler), 1);
    }

    #[test]
    fn handler_queries_component_handler_and_unknown() {
        let handler = AckHandler::create();
        assert!(handler.cast::<IComponentHandler>().is_some());
        unsafe {
            let this = handler.as_ptr().cast::<c_void>();
            let mut obj: *mut c_void = std::ptr::null_mut();
            let rc = (handler.vtbl().base.query_interface)(this, &IPlugFrame::IID, &mut obj);
            assert_eq!(rc, abi::K_NO_INTERFACE);
            assert!(obj.is_null());
        }
    }

    #[test]
    fn frame_forwards_resize_requests() {
        let seen: Arc<Mutex<Vec<(i32, i32)>>> = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let frame = PlugFrame::create(Box::new(move |_view, rect| {
            log.lock().push((rect.width(), rect.height()));
        }));

        let mut rect = ViewRect::with_size(640, 480);
        let rc = unsafe {
            (frame.vtbl().resize_view)(frame.as_ptr(), std::ptr::null_mut(), &mut rect)
        };
        assert_eq!(rc, abi::K_RESULT_OK);
        assert_eq!(seen.lock().as_slice(), &[(640, 480)]);
    }

    #[test]
    fn frame_rejects_null_rect() {
        let frame = PlugFrame::create(Box::new(|_, _| {}));
        let rc = unsafe {
            (frame.vtbl().resize_view)(frame.as_ptr(), std::ptr::null_mut(), std::ptr::null_mut())
        };
        assert_eq!(rc, abi::K_INVALID_ARGUMENT);
    }
}
