//! Plugshot VST3 hosting support.
//!
//! This crate takes a `.vst3` bundle from path to PNG: it loads the module,
//! instantiates the effect class, opens its editor in an off-screen native
//! window, pumps events until the editor has settled, and captures the
//! result. Two hosting paths exist. The runner path negotiates the window
//! size with the editor before creating it; the direct path realizes a
//! fixed-size window first, for older plugins that expect one. The
//! orchestrator tries the runner first and falls back once.
//!
//! Editor windows only work on macOS; on other platforms the window backend
//! refuses, while module loading and class resolution stay fully usable.

pub mod context;
pub mod direct;
pub mod error;
pub mod handler;
pub mod instance;
pub mod module;
pub mod platform;
pub mod runner;
pub mod screenshot;
pub mod session;
pub mod snapshot;
pub mod view;

pub use context::{active_sessions, PluginContextGuard, HOST_NAME};
pub use direct::DirectSession;
pub use error::{HostError, ModuleLoadReason};
pub use handler::{AckHandler, PlugFrame};
pub use instance::PluginInstance;
pub use module::{resolve_effect_class, select_effect_class, ClassId, ClassInfo, VstModule};
pub use platform::{open_window_count, Size};
pub use runner::RunnerSession;
pub use screenshot::{CaptureBackend, NativeBackend, ScreenshotHost, ScreenshotOptions};
pub use session::{EditorSession, HostSession};
pub use snapshot::{write_png, RgbaImage};
pub use view::EditorView;

pub use vst3_abi as abi;
