//! The runner hosting path: size-negotiated, editor-first wiring.
//!
//! The editor view is created before any window exists, asked for its
//! preferred size, and only then given a window cut to fit. This is the
//! path modern plugins expect, and the one tried first.

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::context::PluginContextGuard;
use crate::error::HostError;
use crate::handler::{AckHandler, PlugFrame};
use crate::instance::PluginInstance;
use crate::module::{class_for_session, ClassId, VstModule};
use crate::platform::{self, constrain_to_screen, PlatformWindow, Size, RUNNER_FALLBACK_SIZE};
use crate::screenshot::ScreenshotOptions;
use crate::session::{platform_view_type, HostSession};
use crate::snapshot;
use crate::view::EditorView;

pub struct RunnerSession {
    // Field order is teardown order: the module must outlive everything
    // that holds pointers into it.
    view: Option<EditorView>,
    instance: Option<PluginInstance>,
    window: Option<PlatformWindow>,
    guard: Option<PluginContextGuard>,
    module: Option<VstModule>,
    warmup: Duration,
    closed: bool,
}

impl RunnerSession {
    /// Opens the plugin's editor in a freshly sized off-screen window.
    ///
    /// `class` is a pre-resolved class id when the caller already has one;
    /// otherwise the effect class is selected here, honoring
    /// `opts.class_name`.
    pub fn open(
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<Self, HostError> {
        let guard = PluginContextGuard::acquire();
        let module = VstModule::load(bundle)?;
        if let Some(info) = module.factory_info() {
            debug!(vendor = %info.vendor, url = %info.url, "loaded plugin factory");
        }

        let classes = module.classes();
        let class = class_for_session(&classes, bundle, class, opts.class_name.as_deref())?;

        let mut instance = PluginInstance::create(&module, &class.cid, &guard)?;
        instance.set_handler(AckHandler::create());
        let view = instance.create_view()?;

        let size = negotiate_size(view.size(), platform::visible_screen_size());
        debug!(class = %class.name, size = %size, "negotiated editor size");
        let window = PlatformWindow::create(&class.name, size)?;

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
        debug!(class = %class.name, "runner session open");
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

    /// Tears down in dependency order: view, instance, window, context
    /// guard, module last. Safe to call more than once.
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
        debug!("runner session closed");
    }
}

impl std::fmt::Debug for RunnerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerSession")
            .field("warmup", &self.warmup)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for RunnerSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl HostSession for RunnerSession {
    fn label(&self) -> &'static str {
        "runner"
    }

    fn capture_png(&mut self, output: &Path) -> Result<(), HostError> {
        RunnerSession::capture_png(self, output)
    }

    fn close(&mut self) {
        RunnerSession::close(self);
    }
}

/// Chooses the runner window size: the editor's preferred size when it
/// reports one, a fixed fallback otherwise, clamped to the screen.
fn negotiate_size(preferred: Option<Size>, screen: Option<Size>) -> Size {
    constrain_to_screen(preferred.unwrap_or(RUNNER_FALLBACK_SIZE), screen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn preferred_size_wins_when_reported() {
        let size = negotiate_size(Some(Size::new(640, 420)), Some(Size::new(1920, 1080)));
        assert_eq!(size, Size::new(640, 420));
    }

    #[test]
    fn missing_size_falls_back() {
        assert_eq!(negotiate_size(None, None), RUNNER_FALLBACK_SIZE);
    }

    #[test]
    fn oversized_editors_are_clamped_to_the_screen() {
        let size = negotiate_size(Some(Size::new(4000, 3000)), Some(Size::new(1000, 500)));
        assert_eq!(size, Size::new(800, 400));
    }
}
