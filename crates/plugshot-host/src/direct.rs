//! The direct hosting path: legacy window-first wiring.
//!
//! The window is realized at a fixed default size before the plugin is
//! even loaded, the editor attaches into it, and the window is resized
//! afterwards to whatever the editor reports. Older plugins that refuse
//! the runner path usually accept this one. There is no further fallback
//! behind it.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::context::PluginContextGuard;
use crate::error::HostError;
use crate::handler::{AckHandler, PlugFrame};
use crate::instance::PluginInstance;
use crate::module::{class_for_session, ClassId, VstModule};
use crate::platform::{self, constrain_to_screen, PlatformWindow, Size};
use crate::screenshot::ScreenshotOptions;
use crate::session::{platform_view_type, HostSession};
use crate::snapshot;
use crate::view::EditorView;

pub struct DirectSession {
    view: Option<EditorView>,
    instance: Option<PluginInstance>,
    window: Option<PlatformWindow>,
    guard: Option<PluginContextGuard>,
    module: Option<VstModule>,
    warmup: Duration,
    closed: bool,
}

impl DirectSession {
    /// Opens the plugin's editor inside a pre-built fixed-size window.
    pub fn open(
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<Self, HostError> {
        let guard = PluginContextGuard::acquire();

        let title = bundle
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plugin editor".to_owned());
        let window = PlatformWindow::create(&title, Size::new(opts.width, opts.height))?;

        let module = VstModule::load(bundle)?;
        let classes = module.classes();
        let class = class_for_session(&classes, bundle, class, opts.class_name.as_deref())?;

        let mut instance = PluginInstance::create(&module, &class.cid, &guard)?;
        instance.set_handler(AckHandler::create());
        let view = instance.create_view()?;

        let mut session = Self {
            view: Some(view),
            instance: Some(instance),
            window: Some(window),
            guard: Some(guard),
            module: Some(module),
            warmup: opts.warmup,
            closed: false,
        };
        if let Err(err) = session.finish_open() {
            session.close();
            return Err(err);
        }
        debug!(class = %class.name, "direct session open");
        Ok(session)
    }

    fn finish_open(&mut self) -> Result<(), HostError> {
        let (Some(view), Some(window)) = (self.view.as_mut(), self.window.as_ref()) else {
            return Err(HostError::NoWindow);
        };
        let handle = window.resize_handle();
        view.set_frame(PlugFrame::create(Box::new(move |plug_view, rect| {
            if let Some(size) = Size::from_rect(rect) {
                handle.request_resize(plug_view, size);
            }
        })));
        view.attach(window.content_parent(), platform_view_type())?;

        // Legacy editors report their real size only after attach.
        if let Some(size) = view.size() {
            let size = constrain_to_screen(size, platform::visible_screen_size());
            window.resize_content(size);
            debug!(size = %size, "resized window to the editor's reported size");
        }
        window.present();
        Ok(())
    }

    /// Captures the warmed-up editor into `output`.
    pub fn capture_png(&mut self, output: &Path) -> Result<(), HostError> {
        let Some(window) = self.window.as_ref() else {
            return Err(HostError::CaptureRender("session already closed".into()));
        };
        let image = platform::capture_window(window, self.warmup)?;
        snapshot::write_png(&image, output)
    }

    /// Tears down in dependency order, module last. Safe to call more
    /// than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(mut view) = self.view.take() {
            view.detach();
        }
        if let Some(mut instance) = self.instance.take() {
            instance.terminate();
        }
        if let Some(mut window) = self.window.take() {
            window.hide();
            window.close();
        }
        self.guard.take();
        self.module.take();
        debug!("direct session closed");
    }
}

impl Drop for DirectSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl HostSession for DirectSession {
    fn label(&self) -> &'static str {
        "direct"
    }

    fn capture_png(&mut self, output: &Path) -> Result<(), HostError> {
        DirectSession::capture_png(self, output)
    }

    fn close(&mut self) {
        DirectSession::close(self);
    }
}
