//! Error types shared across the hosting pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure modes on the way from a `.vst3` path to a PNG on disk.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to load plugin module {path}")]
    ModuleLoad {
        path: PathBuf,
        #[source]
        reason: ModuleLoadReason,
    },
    #[error("no audio effect class named {name:?} in {path}")]
    ClassNotFound { name: String, path: PathBuf },
    #[error("{path} exports no audio effect class")]
    NoEffectClass { path: PathBuf },
    #[error("component setup failed: {0}")]
    ComponentInit(String),
    #[error("controller did not provide an editor view")]
    NoEditorView,
    #[error("editor view rejected the {platform} parent surface")]
    ViewAttach { platform: &'static str },
    #[error("no native window available for embedding")]
    NoWindow,
    #[error("native window is not backed by the expected content view")]
    UnsupportedWindowType,
    #[error("editor capture failed: {0}")]
    CaptureRender(String),
    #[error("failed to write {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("PNG encoding failed for {path}")]
    PngEncode {
        path: PathBuf,
        #[source]
        source: png::EncodingError,
    },
    #[error("plugin editor windows are not supported on this platform")]
    PlatformUnsupported,
}

impl HostError {
    pub(crate) fn module_load(path: &std::path::Path, reason: ModuleLoadReason) -> Self {
        Self::ModuleLoad {
            path: path.to_path_buf(),
            reason,
        }
    }
}

/// Why a module refused to load. Dynamic-loader messages are preserved
/// verbatim so callers can surface architecture mismatches.
#[derive(Debug, Error)]
pub enum ModuleLoadReason {
    #[error("bundle does not exist")]
    MissingBundle,
    #[error("bundle has no plugin binary at {0}")]
    MissingBinary(PathBuf),
    #[error(transparent)]
    Dlopen(#[from] libloading::Error),
    #[error("module entry point refused to start")]
    EntryRejected,
    #[error("module exports no `GetPluginFactory`")]
    MissingFactory,
    #[error("`GetPluginFactory` returned no factory")]
    NullFactory,
}
