//! Session abstraction over the two hosting paths.

use std::path::Path;

use vst3_abi as abi;

use crate::direct::DirectSession;
use crate::error::HostError;
use crate::runner::RunnerSession;

/// An open editor session that can be captured and torn down.
pub trait HostSession {
    /// Short name of the hosting path, for logs.
    fn label(&self) -> &'static str;

    /// Captures the editor into `output` as PNG.
    fn capture_png(&mut self, output: &Path) -> Result<(), HostError>;

    /// Tears the session down. Idempotent.
    fn close(&mut self);
}

/// Native session over either hosting path.
pub enum EditorSession {
    Runner(RunnerSession),
    Direct(DirectSession),
}

impl HostSession for EditorSession {
    fn label(&self) -> &'static str {
        match self {
            Self::Runner(session) => session.label(),
            Self::Direct(session) => session.label(),
        }
    }

    fn capture_png(&mut self, output: &Path) -> Result<(), HostError> {
        match self {
            Self::Runner(session) => session.capture_png(output),
            Self::Direct(session) => session.capture_png(output),
        }
    }

    fn close(&mut self) {
        match self {
            Self::Runner(session) => session.close(),
            Self::Direct(session) => session.close(),
        }
    }
}

/// VST3 platform type string for this OS's native parent surface.
pub(crate) fn platform_view_type() -> &'static str {
    if cfg!(target_os = "macos") {
        abi::PLATFORM_TYPE_NSVIEW
    } else {
        abi::PLATFORM_TYPE_X11_WINDOW
    }
}
