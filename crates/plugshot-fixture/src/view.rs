//! The fixture's fixed-size editor view.
//!
//! The view reports a constant 600x400 size, refuses resizing, and on macOS
//! paints a deterministic test card into the parent `NSView` so captures of
//! the hosting window are never blank.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, AtomicU32, Ordering};
#[cfg(target_os = "macos")]
use std::sync::atomic::AtomicUsize;

use vst3_abi as abi;
use vst3_abi::{
    IPlugFrame, IPlugView, IPlugViewVtbl, TBool, Tresult, ViewRect, K_INVALID_ARGUMENT,
    K_NO_INTERFACE, K_RESULT_FALSE, K_RESULT_OK,
};

use crate::com::fixture_unknown;
use crate::{VIEW_HEIGHT, VIEW_WIDTH};

#[repr(C)]
pub(crate) struct FixtureView {
    vtbl: *const IPlugViewVtbl,
    refs: AtomicU32,
    frame: AtomicPtr<IPlugFrame>,
    attached: AtomicBool,
    #[cfg(target_os = "macos")]
    face: AtomicUsize,
}

impl FixtureView {
    /// Boxes a fresh view with one reference owned by the caller.
    pub(crate) fn create() -> *mut IPlugView {
        let boxed = Box::new(Self {
            vtbl: &VIEW_VTBL,
            refs: AtomicU32::new(1),
            frame: AtomicPtr::new(ptr::null_mut()),
            attached: AtomicBool::new(false),
            #[cfg(target_os = "macos")]
            face: AtomicUsize::new(0),
        });
        Box::into_raw(boxed).cast()
    }
}

impl Drop for FixtureView {
    fn drop(&mut self) {
        let frame = self.frame.swap(ptr::null_mut(), Ordering::AcqRel);
        if !frame.is_null() {
            unsafe { release_frame(frame) };
        }
        #[cfg(target_os = "macos")]
        {
            // If `removed` never ran the superview still holds the face;
            // give up only this object's retain.
            let face = self.face.swap(0, Ordering::AcqRel);
            if face != 0 {
                unsafe { face::release_retained(face) };
            }
        }
    }
}

fn native_platform_type() -> &'static str {
    if cfg!(target_os = "macos") {
        abi::PLATFORM_TYPE_NSVIEW
    } else {
        abi::PLATFORM_TYPE_X11_WINDOW
    }
}

unsafe fn release_frame(frame: *mut IPlugFrame) {
    ((*(*frame).vtbl).base.release)(frame.cast());
}

fixture_unknown!(FixtureView, view_query, view_add_ref, view_release, [IPlugView]);

unsafe extern "system" fn view_is_platform_type_supported(
    _this: *mut IPlugView,
    platform_type: *const c_char,
) -> Tresult {
    if platform_type.is_null() {
        return K_INVALID_ARGUMENT;
    }
    if CStr::from_ptr(platform_type).to_bytes() == native_platform_type().as_bytes() {
        K_RESULT_OK
    } else {
        K_RESULT_FALSE
    }
}

unsafe extern "system" fn view_attached(
    this: *mut IPlugView,
    parent: *mut c_void,
    platform_type: *const c_char,
) -> Tresult {
    if parent.is_null() || platform_type.is_null() {
        return K_INVALID_ARGUMENT;
    }
    if CStr::from_ptr(platform_type).to_bytes() != native_platform_type().as_bytes() {
        return K_RESULT_FALSE;
    }
    let view = &*this.cast::<FixtureView>();
    if view.attached.swap(true, Ordering::AcqRel) {
        return K_INVALID_ARGUMENT;
    }
    #[cfg(target_os = "macos")]
    view.face.store(face::install(parent), Ordering::Release);
    K_RESULT_OK
}

unsafe extern "system" fn view_removed(this: *mut IPlugView) -> Tresult {
    let view = &*this.cast::<FixtureView>();
    view.attached.store(false, Ordering::Release);
    #[cfg(target_os = "macos")]
    {
        let face = view.face.swap(0, Ordering::AcqRel);
        if face != 0 {
            face::remove(face);
        }
    }
    K_RESULT_OK
}

unsafe extern "system" fn view_on_wheel(_this: *mut IPlugView, _distance: f32) -> Tresult {
    K_RESULT_FALSE
}

unsafe extern "system" fn view_on_key_down(
    _this: *mut IPlugView,
    _key: i16,
    _key_code: i16,
    _modifiers: i16,
) -> Tresult {
    K_RESULT_FALSE
}

unsafe extern "system" fn view_on_key_up(
    _this: *mut IPlugView,
    _key: i16,
    _key_code: i16,
    _modifiers: i16,
) -> Tresult {
    K_RESULT_FALSE
}

unsafe extern "system" fn view_get_size(_this: *mut IPlugView, size: *mut ViewRect) -> Tresult {
    if size.is_null() {
        return K_INVALID_ARGUMENT;
    }
    *size = ViewRect::with_size(VIEW_WIDTH, VIEW_HEIGHT);
    K_RESULT_OK
}

unsafe extern "system" fn view_on_size(
    _this: *mut IPlugView,
    new_size: *const ViewRect,
) -> Tresult {
    if new_size.is_null() {
        return K_INVALID_ARGUMENT;
    }
    // Fixed-size view; the host may still announce the rect it settled on.
    K_RESULT_OK
}

unsafe extern "system" fn view_on_focus(_this: *mut IPlugView, _state: TBool) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn view_set_frame(
    this: *mut IPlugView,
    frame: *mut IPlugFrame,
) -> Tresult {
    if !frame.is_null() {
        ((*(*frame).vtbl).base.add_ref)(frame.cast());
    }
    let view = &*this.cast::<FixtureView>();
    let previous = view.frame.swap(frame, Ordering::AcqRel);
    if !previous.is_null() {
        release_frame(previous);
    }
    K_RESULT_OK
}

unsafe extern "system" fn view_can_resize(_this: *mut IPlugView) -> Tresult {
    K_RESULT_FALSE
}

unsafe extern "system" fn view_check_size_constraint(
    _this: *mut IPlugView,
    rect: *mut ViewRect,
) -> Tresult {
    if rect.is_null() {
        return K_INVALID_ARGUMENT;
    }
    let rect = &mut *rect;
    let forced = ViewRect {
        left: rect.left,
        top: rect.top,
        right: rect.left + VIEW_WIDTH,
        bottom: rect.top + VIEW_HEIGHT,
    };
    if *rect == forced {
        K_RESULT_OK
    } else {
        *rect = forced;
        K_RESULT_FALSE
    }
}

static VIEW_VTBL: IPlugViewVtbl = IPlugViewVtbl {
    base: abi::FUnknownVtbl {
        query_interface: view_query,
        add_ref: view_add_ref,
        release: view_release,
    },
    is_platform_type_supported: view_is_platform_type_supported,
    attached: view_attached,
    removed: view_removed,
    on_wheel: view_on_wheel,
    on_key_down: view_on_key_down,
    on_key_up: view_on_key_up,
    get_size: view_get_size,
    on_size: view_on_size,
    on_focus: view_on_focus,
    set_frame: view_set_frame,
    can_resize: view_can_resize,
    check_size_constraint: view_check_size_constraint,
};

/// Test-card rendering. Handles are `NSImageView` pointers as `usize` so the
/// rest of the file stays free of Objective-C types.
#[cfg(target_os = "macos")]
mod face {
    use cocoa::base::{id, nil, NO, YES};
    use cocoa::foundation::{NSPoint, NSRect, NSSize, NSString};
    use objc::{class, msg_send, sel, sel_impl};

    use crate::{VIEW_HEIGHT, VIEW_WIDTH};

    /// RGBA for one pixel of the card: a light border ring around a
    /// two-axis gradient.
    fn pixel(x: usize, y: usize) -> [u8; 4] {
        let w = VIEW_WIDTH as usize;
        let h = VIEW_HEIGHT as usize;
        if x < 8 || y < 8 || x >= w - 8 || y >= h - 8 {
            [0xF0, 0xF0, 0xF0, 0xFF]
        } else {
            [(x * 255 / w) as u8, (y * 255 / h) as u8, 0x46, 0xFF]
        }
    }

    /// Adds an image view filled with the card to `parent`; returns the
    /// retained view, or 0 if AppKit refused the bitmap.
    pub(super) unsafe fn install(parent: *mut core::ffi::c_void) -> usize {
        let rep: id = msg_send![class!(NSBitmapImageRep), alloc];
        let space = NSString::alloc(nil).init_str("NSDeviceRGBColorSpace");
        let rep: id = msg_send![rep,
            initWithBitmapDataPlanes: core::ptr::null_mut::<*mut u8>()
            pixelsWide: VIEW_WIDTH as isize
            pixelsHigh: VIEW_HEIGHT as isize
            bitsPerSample: 8isize
            samplesPerPixel: 4isize
            hasAlpha: YES
            isPlanar: NO
            colorSpaceName: space
            bytesPerRow: (VIEW_WIDTH * 4) as isize
            bitsPerPixel: 32isize];
        let _: () = msg_send![space, release];
        if rep == nil {
            return 0;
        }
        let data: *mut u8 = msg_send![rep, bitmapData];
        if data.is_null() {
            let _: () = msg_send![rep, release];
            return 0;
        }
        let stride = VIEW_WIDTH as usize * 4;
        for y in 0..VIEW_HEIGHT as usize {
            for x in 0..VIEW_WIDTH as usize {
                let rgba = pixel(x, y);
                core::ptr::copy_nonoverlapping(rgba.as_ptr(), data.add(y * stride + x * 4), 4);
            }
        }

        let size = NSSize::new(f64::from(VIEW_WIDTH), f64::from(VIEW_HEIGHT));
        let image: id = msg_send![class!(NSImage), alloc];
        let image: id = msg_send![image, initWithSize: size];
        let _: () = msg_send![image, addRepresentation: rep];
        let _: () = msg_send![rep, release];

        let frame = NSRect::new(NSPoint::new(0.0, 0.0), size);
        let view: id = msg_send![class!(NSImageView), alloc];
        let view: id = msg_send![view, initWithFrame: frame];
        let _: () = msg_send![view, setImage: image];
        let _: () = msg_send![image, release];
        let _: () = msg_send![parent as id, addSubview: view];
        view as usize
    }

    /// Unparents the card and drops this object's retain.
    pub(super) unsafe fn remove(face: usize) {
        let view = face as id;
        let _: () = msg_send![view, removeFromSuperview];
        let _: () = msg_send![view, release];
    }

    /// Drops this object's retain without touching the view hierarchy.
    pub(super) unsafe fn release_retained(face: usize) {
        let _: () = msg_send![face as id, release];
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use vst3_abi::Interface;

    use super::*;

    unsafe fn call_release(view: *mut IPlugView) -> u32 {
        ((*(*view).vtbl).base.release)(view.cast())
    }

    #[test]
    fn reports_the_fixed_editor_size() {
        let view = FixtureView::create();
        let mut rect = ViewRect::default();
        let rc = unsafe { ((*(*view).vtbl).get_size)(view, &mut rect) };
        assert_eq!(rc, K_RESULT_OK);
        assert_eq!(rect.width(), VIEW_WIDTH);
        assert_eq!(rect.height(), VIEW_HEIGHT);
        assert_eq!(unsafe { call_release(view) }, 0);
    }

    #[test]
    fn refuses_resizing() {
        let view = FixtureView::create();
        assert_eq!(unsafe { ((*(*view).vtbl).can_resize)(view) }, K_RESULT_FALSE);
        let mut rect = ViewRect::with_size(1024, 768);
        let rc = unsafe { ((*(*view).vtbl).check_size_constraint)(view, &mut rect) };
        assert_eq!(rc, K_RESULT_FALSE);
        assert_eq!(rect.width(), VIEW_WIDTH);
        assert_eq!(rect.height(), VIEW_HEIGHT);
        unsafe { call_release(view) };
    }

    #[test]
    fn only_the_native_platform_type_is_supported() {
        let view = FixtureView::create();
        let native = CString::new(native_platform_type()).expect("platform type");
        let foreign = CString::new("HWND").expect("platform type");
        unsafe {
            let vtbl = &*(*view).vtbl;
            assert_eq!(
                (vtbl.is_platform_type_supported)(view, native.as_ptr()),
                K_RESULT_OK
            );
            assert_eq!(
                (vtbl.is_platform_type_supported)(view, foreign.as_ptr()),
                K_RESULT_FALSE
            );
            call_release(view);
        }
    }

    #[test]
    fn query_interface_answers_plug_view_only() {
        let view = FixtureView::create();
        unsafe {
            let vtbl = &*(*view).vtbl;
            let mut obj: *mut c_void = ptr::null_mut();
            let rc = (vtbl.base.query_interface)(view.cast(), &IPlugView::IID, &mut obj);
            assert_eq!(rc, K_RESULT_OK);
            assert_eq!(obj, view.cast());
            (vtbl.base.release)(obj);

            let mut obj: *mut c_void = ptr::null_mut();
            let rc = (vtbl.base.query_interface)(view.cast(), &IPlugFrame::IID, &mut obj);
            assert_eq!(rc, K_NO_INTERFACE);
            assert!(obj.is_null());
            call_release(view);
        }
    }

    #[test]
    fn set_frame_balances_frame_references() {
        use vst3_abi::{FUnknownVtbl, IPlugFrameVtbl, TUID};

        static FRAME_REFS: AtomicU32 = AtomicU32::new(0);

        unsafe extern "system" fn frame_query(
            _this: *mut c_void,
            _iid: *const TUID,
            obj: *mut *mut c_void,
        ) -> Tresult {
            *obj = ptr::null_mut();
            K_NO_INTERFACE
        }
        unsafe extern "system" fn frame_add_ref(_this: *mut c_void) -> u32 {
            FRAME_REFS.fetch_add(1, Ordering::Relaxed) + 1
        }
        unsafe extern "system" fn frame_release(_this: *mut c_void) -> u32 {
            FRAME_REFS.fetch_sub(1, Ordering::Relaxed) - 1
        }
        unsafe extern "system" fn frame_resize_view(
            _this: *mut IPlugFrame,
            _view: *mut IPlugView,
            _new_size: *mut ViewRect,
        ) -> Tresult {
            K_RESULT_OK
        }

        static FRAME_VTBL: IPlugFrameVtbl = IPlugFrameVtbl {
            base: FUnknownVtbl {
                query_interface: frame_query,
                add_ref: frame_add_ref,
                release: frame_release,
            },
            resize_view: frame_resize_view,
        };
        struct StaticFrame(IPlugFrame);
        unsafe impl Sync for StaticFrame {}
        static FRAME: StaticFrame = StaticFrame(IPlugFrame { vtbl: &FRAME_VTBL });

        let view = FixtureView::create();
        let frame_ptr = (&FRAME.0 as *const IPlugFrame).cast_mut();
        unsafe {
            let vtbl = &*(*view).vtbl;
            assert_eq!((vtbl.set_frame)(view, frame_ptr), K_RESULT_OK);
            assert_eq!(FRAME_REFS.load(Ordering::Relaxed), 1);
            assert_eq!((vtbl.set_frame)(view, ptr::null_mut()), K_RESULT_OK);
            assert_eq!(FRAME_REFS.load(Ordering::Relaxed), 0);

            // A frame still held when the view dies is released by drop.
            (vtbl.set_frame)(view, frame_ptr);
            assert_eq!(FRAME_REFS.load(Ordering::Relaxed), 1);
            call_release(view);
            assert_eq!(FRAME_REFS.load(Ordering::Relaxed), 0);
        }
    }
}
