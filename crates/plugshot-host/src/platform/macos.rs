//! AppKit windows, the event pump and editor capture.
//!
//! The window-server capture entry point is resolved from the CoreGraphics
//! framework binary at runtime; the symbol is permission-gated and no
//! longer part of the public SDK surface, so linking it statically is not
//! an option. The handful of image helpers used to normalize its output
//! come from the same library.

use std::ffi::c_void;
use std::sync::Once;
use std::time::{Duration, Instant};

use cocoa::appkit::{
    NSApp, NSApplication, NSApplicationActivationPolicy, NSBackingStoreType, NSEventMask,
    NSScreen, NSWindow, NSWindowStyleMask,
};
use cocoa::base::{id, nil, BOOL, NO, YES};
use cocoa::foundation::{
    NSAutoreleasePool, NSDate, NSInteger, NSPoint, NSRect, NSSize, NSString,
};
use core_graphics::base::CGFloat;
use core_graphics::geometry::{CGPoint, CGRect, CGSize};
use dispatch::Queue;
use libloading::Library;
use objc::{class, msg_send, sel, sel_impl};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use vst3_abi::{IPlugView, ViewRect};

use super::Size;
use crate::error::HostError;
use crate::snapshot::RgbaImage;

// Parked far outside any plausible display arrangement.
const OFFSCREEN_X: CGFloat = -16000.0;
const OFFSCREEN_Y: CGFloat = -16000.0;

struct AutoPool(id);

impl AutoPool {
    fn new() -> Self {
        unsafe { Self(NSAutoreleasePool::new(nil)) }
    }
}

impl Drop for AutoPool {
    fn drop(&mut self) {
        unsafe { self.0.drain() }
    }
}

static APP_INIT: Once = Once::new();

/// Brings up the shared application exactly once. Editor views refuse to
/// attach before AppKit has finished launching.
fn ensure_app() {
    APP_INIT.call_once(|| unsafe {
        let app = NSApp();
        app.setActivationPolicy_(
            NSApplicationActivationPolicy::NSApplicationActivationPolicyRegular,
        );
        app.finishLaunching();
        debug!("initialized shared AppKit application");
    });
}

/// Titled window parked off the visible area, holding the editor view for
/// the lifetime of a session.
pub struct PlatformWindow {
    window: id,
    content: id,
    closed: bool,
}

impl PlatformWindow {
    pub fn create(title: &str, content_size: Size) -> Result<Self, HostError> {
        ensure_app();
        unsafe {
            let _pool = AutoPool::new();
            let rect = NSRect::new(
                NSPoint::new(OFFSCREEN_X, OFFSCREEN_Y),
                NSSize::new(content_size.width as CGFloat, content_size.height as CGFloat),
            );
            let window = NSWindow::alloc(nil).initWithContentRect_styleMask_backing_defer_(
                rect,
                NSWindowStyleMask::NSTitledWindowMask,
                NSBackingStoreType::NSBackingStoreBuffered,
                NO,
            );
            if window == nil {
                return Err(HostError::NoWindow);
            }
            // The session owns the window; AppKit must not free it on close.
            let _: () = msg_send![window, setReleasedWhenClosed: NO];

            let ns_title = NSString::alloc(nil).init_str(title);
            window.setTitle_(ns_title);
            let _: () = msg_send![ns_title, release];

            let content = window.contentView();
            if content == nil {
                let _: () = msg_send![window, release];
                return Err(HostError::UnsupportedWindowType);
            }

            super::register_window();
            debug!(title, size = %content_size, "created off-screen editor window");
            Ok(Self {
                window,
                content,
                closed: false,
            })
        }
    }

    /// Native `NSView` pointer plugin editors attach to.
    pub fn content_parent(&self) -> *mut c_void {
        self.content as *mut c_void
    }

    fn window_number(&self) -> NSInteger {
        unsafe { msg_send![self.window, windowNumber] }
    }

    /// Orders the window front and draws it. The window stays off-screen,
    /// but the window server now has real contents for it.
    pub fn present(&self) {
        unsafe {
            let _pool = AutoPool::new();
            NSApp().activateIgnoringOtherApps_(YES);
            self.window.makeKeyAndOrderFront_(nil);
            let _: () = msg_send![self.window, display];
        }
    }

    fn display_now(&self) {
        unsafe {
            let _: () = msg_send![self.window, display];
        }
    }

    /// Resizes the content area immediately, on the current thread.
    pub fn resize_content(&self, size: Size) {
        unsafe {
            self.window
                .setContentSize_(NSSize::new(size.width as CGFloat, size.height as CGFloat));
        }
    }

    pub fn resize_handle(&self) -> ResizeHandle {
        ResizeHandle {
            window: self.window as usize,
        }
    }

    pub fn hide(&self) {
        unsafe {
            self.window.orderOut_(nil);
        }
    }

    /// Closes and releases the window. Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        unsafe {
            let _pool = AutoPool::new();
            self.window.orderOut_(nil);
            let _: () = msg_send![self.window, close];
            let _: () = msg_send![self.window, release];
        }
        super::unregister_window();
        debug!("closed editor window");
    }
}

impl Drop for PlatformWindow {
    fn drop(&mut self) {
        self.close();
    }
}

/// Cloneable handle for applying editor resize requests on the main
/// thread, used from the plug frame callback.
#[derive(Clone)]
pub struct ResizeHandle {
    window: usize,
}

impl ResizeHandle {
    /// Queues a content resize plus `onSize` notification. The window and
    /// view are retained until the block has run, so a request that lands
    /// during teardown cannot touch freed objects.
    pub fn request_resize(&self, view: *mut IPlugView, size: Size) {
        let window_bits = self.window;
        let view_bits = view as usize;
        unsafe {
            let _: id = msg_send![window_bits as id, retain];
            if !view.is_null() {
                ((*(*view).vtbl).base.add_ref)(view.cast());
            }
        }
        Queue::main().exec_async(move || unsafe {
            let window = window_bits as id;
            window.setContentSize_(NSSize::new(size.width as CGFloat, size.height as CGFloat));
            if view_bits != 0 {
                let view = view_bits as *mut IPlugView;
                let mut rect = ViewRect::with_size(size.width as i32, size.height as i32);
                ((*(*view).vtbl).on_size)(view, &mut rect);
                ((*(*view).vtbl).base.release)(view.cast());
            }
            let _: () = msg_send![window, release];
        });
        debug!(size = %size, "queued editor resize");
    }
}

/// Drains AppKit events in small timeslices until the deadline, giving the
/// editor time to lay out, animate and settle.
pub fn pump_events(duration: Duration) {
    ensure_app();
    let deadline = Instant::now() + duration;
    unsafe {
        let app = NSApp();
        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            let _pool = AutoPool::new();
            let slice = (deadline - now).min(Duration::from_millis(20));
            let until = NSDate::dateWithTimeIntervalSinceNow_(nil, slice.as_secs_f64());
            let mode = NSString::alloc(nil)
                .init_str("kCFRunLoopDefaultMode")
                .autorelease();
            let event = app.nextEventMatchingMask_untilDate_inMode_dequeue_(
                NSEventMask::NSAnyEventMask.bits(),
                until,
                mode,
                YES,
            );
            if event != nil {
                app.sendEvent_(event);
            }
        }
    }
}

/// Usable frame of the main screen, for clamping editor windows.
pub fn visible_screen_size() -> Option<Size> {
    ensure_app();
    unsafe {
        let _pool = AutoPool::new();
        let screen = NSScreen::mainScreen(nil);
        if screen == nil {
            return None;
        }
        let frame = screen.visibleFrame();
        let width = frame.size.width as u32;
        let height = frame.size.height as u32;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Size::new(width, height))
    }
}

/// Pumps events for `warmup`, forces a redraw, then captures the window.
///
/// The window server path needs screen-recording permission; when it
/// yields nothing the content view is rendered directly instead, which
/// works without the permission but misses child windows the plugin may
/// have opened.
pub fn capture_window(window: &PlatformWindow, warmup: Duration) -> Result<RgbaImage, HostError> {
    unsafe {
        NSApp().activateIgnoringOtherApps_(YES);
    }
    pump_events(warmup);
    window.display_now();

    match capture_via_window_server(window.window_number() as u32) {
        Ok(image) => Ok(image),
        Err(err) => {
            warn!(error = %err, "window server capture failed, rendering the content view");
            unsafe { render_view_to_image(window.content) }
        }
    }
}

const COREGRAPHICS_PATH: &str =
    "/System/Library/Frameworks/CoreGraphics.framework/Versions/A/CoreGraphics";

// CGWindowList / CGBitmapContext ABI constants.
const INCLUDING_WINDOW: u32 = 1 << 3;
const IGNORE_FRAMING: u32 = 1 << 0;
const NOMINAL_RESOLUTION: u32 = 1 << 4;
const ALPHA_PREMULTIPLIED_LAST: u32 = 1;

type CGImageRef = *mut c_void;
type CGContextRef = *mut c_void;
type CGColorSpaceRef = *mut c_void;

type WindowListCreateImageProc = unsafe extern "C" fn(CGRect, u32, u32, u32) -> CGImageRef;
type ImageGetSizeProc = unsafe extern "C" fn(CGImageRef) -> usize;
type ReleaseProc = unsafe extern "C" fn(*mut c_void);
type ColorSpaceCreateProc = unsafe extern "C" fn() -> CGColorSpaceRef;
type BitmapContextCreateProc = unsafe extern "C" fn(
    *mut c_void,
    usize,
    usize,
    usize,
    usize,
    CGColorSpaceRef,
    u32,
) -> CGContextRef;
type ContextDrawImageProc = unsafe extern "C" fn(CGContextRef, CGRect, CGImageRef);

struct CaptureProcs {
    window_list_create_image: WindowListCreateImageProc,
    image_get_width: ImageGetSizeProc,
    image_get_height: ImageGetSizeProc,
    image_release: ReleaseProc,
    color_space_create_device_rgb: ColorSpaceCreateProc,
    color_space_release: ReleaseProc,
    bitmap_context_create: BitmapContextCreateProc,
    context_draw_image: ContextDrawImageProc,
    context_release: ReleaseProc,
}

fn capture_procs() -> Result<&'static CaptureProcs, HostError> {
    static LIBRARY: OnceCell<Library> = OnceCell::new();
    static PROCS: OnceCell<CaptureProcs> = OnceCell::new();

    if let Some(procs) = PROCS.get() {
        return Ok(procs);
    }

    let library = LIBRARY
        .get_or_try_init(|| unsafe { Library::new(COREGRAPHICS_PATH) })
        .map_err(|err| {
            HostError::CaptureRender(format!("CoreGraphics framework unavailable: {err}"))
        })?;

    let symbol_err =
        |name: &str, err: libloading::Error| HostError::CaptureRender(format!("{name}: {err}"));

    let procs = unsafe {
        CaptureProcs {
            window_list_create_image: *library
                .get::<WindowListCreateImageProc>(b"CGWindowListCreateImage\0")
                .map_err(|e| symbol_err("CGWindowListCreateImage", e))?,
            image_get_width: *library
                .get::<ImageGetSizeProc>(b"CGImageGetWidth\0")
                .map_err(|e| symbol_err("CGImageGetWidth", e))?,
            image_get_height: *library
                .get::<ImageGetSizeProc>(b"CGImageGetHeight\0")
                .map_err(|e| symbol_err("CGImageGetHeight", e))?,
            image_release: *library
                .get::<ReleaseProc>(b"CGImageRelease\0")
                .map_err(|e| symbol_err("CGImageRelease", e))?,
            color_space_create_device_rgb: *library
                .get::<ColorSpaceCreateProc>(b"CGColorSpaceCreateDeviceRGB\0")
                .map_err(|e| symbol_err("CGColorSpaceCreateDeviceRGB", e))?,
            color_space_release: *library
                .get::<ReleaseProc>(b"CGColorSpaceRelease\0")
                .map_err(|e| symbol_err("CGColorSpaceRelease", e))?,
            bitmap_context_create: *library
                .get::<BitmapContextCreateProc>(b"CGBitmapContextCreate\0")
                .map_err(|e| symbol_err("CGBitmapContextCreate", e))?,
            context_draw_image: *library
                .get::<ContextDrawImageProc>(b"CGContextDrawImage\0")
                .map_err(|e| symbol_err("CGContextDrawImage", e))?,
            context_release: *library
                .get::<ReleaseProc>(b"CGContextRelease\0")
                .map_err(|e| symbol_err("CGContextRelease", e))?,
        }
    };
    Ok(PROCS.get_or_init(|| procs))
}

fn capture_via_window_server(window_number: u32) -> Result<RgbaImage, HostError> {
    let procs = capture_procs()?;
    unsafe {
        let null_rect = CGRect::new(
            &CGPoint::new(CGFloat::INFINITY, CGFloat::INFINITY),
            &CGSize::new(0.0, 0.0),
        );
        let image = (procs.window_list_create_image)(
            null_rect,
            INCLUDING_WINDOW,
            window_number,
            IGNORE_FRAMING | NOMINAL_RESOLUTION,
        );
        if image.is_null() {
            return Err(HostError::CaptureRender(
                "window server returned no image (is screen recording allowed?)".into(),
            ));
        }
        let result = normalize_image(procs, image);
        (procs.image_release)(image);
        result
    }
}

/// Draws the captured image into a host-owned RGBA8 buffer so the output
/// layout never depends on what the window server handed back.
unsafe fn normalize_image(
    procs: &CaptureProcs,
    image: CGImageRef,
) -> Result<RgbaImage, HostError> {
    let width = (procs.image_get_width)(image);
    let height = (procs.image_get_height)(image);
    if width == 0 || height == 0 {
        return Err(HostError::CaptureRender(
            "window server produced an empty image".into(),
        ));
    }

    let mut pixels = vec![0u8; width * height * 4];
    let space = (procs.color_space_create_device_rgb)();
    if space.is_null() {
        return Err(HostError::CaptureRender(
            "device RGB color space unavailable".into(),
        ));
    }
    let ctx = (procs.bitmap_context_create)(
        pixels.as_mut_ptr().cast(),
        width,
        height,
        8,
        width * 4,
        space,
        ALPHA_PREMULTIPLIED_LAST,
    );
    if ctx.is_null() {
        (procs.color_space_release)(space);
        return Err(HostError::CaptureRender(
            "failed to create the normalization context".into(),
        ));
    }
    let rect = CGRect::new(
        &CGPoint::new(0.0, 0.0),
        &CGSize::new(width as CGFloat, height as CGFloat),
    );
    (procs.context_draw_image)(ctx, rect, image);
    (procs.context_release)(ctx);
    (procs.color_space_release)(space);

    Ok(RgbaImage::new(width as u32, height as u32, pixels))
}

/// Renders the content view into a bitmap rep, no window server involved.
unsafe fn render_view_to_image(view: id) -> Result<RgbaImage, HostError> {
    let _pool = AutoPool::new();
    let bounds: NSRect = msg_send![view, bounds];
    if bounds.size.width < 1.0 || bounds.size.height < 1.0 {
        return Err(HostError::CaptureRender(
            "content view has empty bounds".into(),
        ));
    }

    let rep: id = msg_send![view, bitmapImageRepForCachingDisplayInRect: bounds];
    if rep != nil {
        let _: () = msg_send![view, cacheDisplayInRect: bounds toBitmapImageRep: rep];
        return rep_to_rgba(rep);
    }

    // Some views will not vend a caching rep; draw through an explicit
    // graphics context instead.
    let width = bounds.size.width.ceil() as NSInteger;
    let height = bounds.size.height.ceil() as NSInteger;
    let color_space = NSString::alloc(nil)
        .init_str("NSDeviceRGBColorSpace")
        .autorelease();
    let rep: id = msg_send![class!(NSBitmapImageRep), alloc];
    let rep: id = msg_send![rep,
        initWithBitmapDataPlanes: std::ptr::null_mut::<*mut u8>()
        pixelsWide: width
        pixelsHigh: height
        bitsPerSample: 8 as NSInteger
        samplesPerPixel: 4 as NSInteger
        hasAlpha: YES
        isPlanar: NO
        colorSpaceName: color_space
        bytesPerRow: 0 as NSInteger
        bitsPerPixel: 0 as NSInteger];
    if rep == nil {
        return Err(HostError::CaptureRender(
            "failed to allocate a bitmap rep for the view".into(),
        ));
    }

    let context: id = msg_send![class!(NSGraphicsContext), graphicsContextWithBitmapImageRep: rep];
    if context == nil {
        let _: () = msg_send![rep, release];
        return Err(HostError::CaptureRender(
            "failed to create a graphics context for the view".into(),
        ));
    }
    let _: () = msg_send![class!(NSGraphicsContext), saveGraphicsState];
    let _: () = msg_send![class!(NSGraphicsContext), setCurrentContext: context];
    let _: () = msg_send![view, displayRectIgnoringOpacity: bounds inContext: context];
    let _: () = msg_send![class!(NSGraphicsContext), restoreGraphicsState];

    let result = rep_to_rgba(rep);
    let _: () = msg_send![rep, release];
    result
}

/// Repacks a bitmap rep into tight RGBA rows, expanding 3-sample RGB with
/// an opaque alpha channel.
unsafe fn rep_to_rgba(rep: id) -> Result<RgbaImage, HostError> {
    let width: NSInteger = msg_send![rep, pixelsWide];
    let height: NSInteger = msg_send![rep, pixelsHigh];
    let bits_per_sample: NSInteger = msg_send![rep, bitsPerSample];
    let samples: NSInteger = msg_send![rep, samplesPerPixel];
    let stride: NSInteger = msg_send![rep, bytesPerRow];
    let data: *const u8 = msg_send![rep, bitmapData];

    if width <= 0 || height <= 0 || data.is_null() {
        return Err(HostError::CaptureRender(
            "bitmap rep has no backing data".into(),
        ));
    }
    let is_planar: BOOL = msg_send![rep, isPlanar];
    if is_planar != NO {
        return Err(HostError::CaptureRender(
            "planar bitmap layouts are not supported".into(),
        ));
    }
    if bits_per_sample != 8 || !(3..=4).contains(&samples) {
        return Err(HostError::CaptureRender(format!(
            "unsupported bitmap layout: {bits_per_sample} bits/sample, {samples} samples/pixel"
        )));
    }

    let (width, height) = (width as usize, height as usize);
    let samples = samples as usize;
    let stride = stride as usize;
    let mut pixels = Vec::with_capacity(width * height * 4);
    for row in 0..height {
        let line = std::slice::from_raw_parts(data.add(row * stride), width * samples);
        if samples == 4 {
            pixels.extend_from_slice(line);
        } else {
            for px in line.chunks_exact(3) {
                pixels.extend_from_slice(px);
                pixels.push(0xFF);
            }
        }
    }
    Ok(RgbaImage::new(width as u32, height as u32, pixels))
}
