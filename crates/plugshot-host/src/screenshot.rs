//! Orchestration: one screenshot run from bundle path to PNG on disk.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::direct::DirectSession;
use crate::error::HostError;
use crate::module::{resolve_effect_class, ClassId};
use crate::runner::RunnerSession;
use crate::session::{EditorSession, HostSession};

/// Capture configuration, CLI-shaped.
#[derive(Clone, Debug)]
pub struct ScreenshotOptions {
    /// Initial window width for the direct path.
    pub width: u32,
    /// Initial window height for the direct path.
    pub height: u32,
    /// Exact class name to host instead of the first effect class.
    pub class_name: Option<String>,
    /// How long to pump events before capturing.
    pub warmup: Duration,
}

impl Default for ScreenshotOptions {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            class_name: None,
            warmup: Duration::from_millis(500),
        }
    }
}

/// Seam between orchestration and native hosting, so the path selection
/// logic is testable without AppKit or a real plugin.
pub trait CaptureBackend {
    type Session: HostSession;

    /// Resolves an exact class name ahead of hosting.
    fn resolve_class(&mut self, bundle: &Path, name: &str) -> Result<ClassId, HostError>;

    fn open_runner(
        &mut self,
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<Self::Session, HostError>;

    fn open_direct(
        &mut self,
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<Self::Session, HostError>;
}

/// Backend hosting real plugins in native windows.
#[derive(Default)]
pub struct NativeBackend;

impl CaptureBackend for NativeBackend {
    type Session = EditorSession;

    fn resolve_class(&mut self, bundle: &Path, name: &str) -> Result<ClassId, HostError> {
        resolve_effect_class(bundle, Some(name))
    }

    fn open_runner(
        &mut self,
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<EditorSession, HostError> {
        RunnerSession::open(bundle, class, opts).map(EditorSession::Runner)
    }

    fn open_direct(
        &mut self,
        bundle: &Path,
        class: Option<&ClassId>,
        opts: &ScreenshotOptions,
    ) -> Result<EditorSession, HostError> {
        DirectSession::open(bundle, class, opts).map(EditorSession::Direct)
    }
}

/// Drives one capture run over a backend. At most one session is live at
/// any point.
pub struct ScreenshotHost<B = NativeBackend> {
    backend: B,
}

impl ScreenshotHost<NativeBackend> {
    pub fn new() -> Self {
        Self::with_backend(NativeBackend)
    }
}

impl Default for ScreenshotHost<NativeBackend> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: CaptureBackend> ScreenshotHost<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Captures `bundle`'s editor into `output`.
    ///
    /// The runner path is tried first; when it cannot open, the direct
    /// path gets one attempt. A failure after a session opened is final,
    /// there is no second session. Whatever happens, the session is closed
    /// before returning.
    pub fn capture_plugin(
        &mut self,
        bundle: &Path,
        output: &Path,
        opts: &ScreenshotOptions,
    ) -> Result<(), HostError> {
        info!(
            bundle = %bundle.display(),
            output = %output.display(),
            "capturing plugin editor"
        );

        let class = match opts.class_name.as_deref() {
            Some(name) => Some(self.backend.resolve_class(bundle, name)?),
            None => None,
        };

        let mut session = match self.backend.open_runner(bundle, class.as_ref(), opts) {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "runner path failed to open, trying the direct path");
                self.backend.open_direct(bundle, class.as_ref(), opts)?
            }
        };

        let result = session.capture_png(output);
        session.close();

        match &result {
            Ok(()) => {
                info!(output = %output.display(), via = session.label(), "editor captured");
            }
            Err(err) => {
                warn!(error = %err, via = session.label(), "capture failed");
            }
        }
        result
    }
}
