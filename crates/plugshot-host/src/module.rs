//! Loading `.vst3` modules and resolving the class to host.
//!
//! A `.vst3` path is either a bundle directory with the platform binary at a
//! well-known location inside, or a flat shared object that is loaded as-is.
//! The module keeps the library, the platform entry state, and the plugin
//! factory together so teardown happens in the right order: factory released
//! first, exit entry point called, library closed last.

use std::ffi::c_void;
use std::fmt;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, warn};
use vst3_abi as abi;
use vst3_abi::{ComPtr, IPluginFactory, Interface, PClassInfo, PFactoryInfo};

#[cfg(target_os = "macos")]
use core_foundation::base::TCFType;
#[cfg(target_os = "macos")]
use core_foundation::bundle::CFBundle;
#[cfg(target_os = "macos")]
use core_foundation::url::CFURL;

use crate::error::{HostError, ModuleLoadReason};

/// 16-byte class identifier with hex formatting.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(abi::TUID);

impl ClassId {
    pub const fn from_tuid(raw: abi::TUID) -> Self {
        Self(raw)
    }

    pub const fn as_tuid(&self) -> &abi::TUID {
        &self.0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({self})")
    }
}

/// One class exported by a module's factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassInfo {
    pub cid: ClassId,
    pub cardinality: i32,
    pub category: String,
    pub name: String,
}

impl ClassInfo {
    fn from_raw(raw: &PClassInfo) -> Self {
        Self {
            cid: ClassId::from_tuid(raw.cid),
            cardinality: raw.cardinality,
            category: decode_cstr(&raw.category),
            name: decode_cstr(&raw.name),
        }
    }

    pub fn is_audio_effect(&self) -> bool {
        self.category == abi::KIND_AUDIO_MODULE_CLASS
    }
}

/// Vendor identity advertised by a module's factory.
#[derive(Clone, Debug, Default)]
pub struct FactoryInfo {
    pub vendor: String,
    pub url: String,
}

/// A loaded VST3 module and its plugin factory.
pub struct VstModule {
    bundle: PathBuf,
    binary: PathBuf,
    factory: ManuallyDrop<ComPtr<IPluginFactory>>,
    #[cfg(target_os = "macos")]
    _bundle_ref: Option<CFBundle>,
    library: Library,
}

impl VstModule {
    /// Loads the module behind `bundle` and obtains its factory.
    pub fn load(bundle: &Path) -> Result<Self, HostError> {
        if !bundle.exists() {
            return Err(HostError::module_load(bundle, ModuleLoadReason::MissingBundle));
        }
        let binary = resolve_binary(bundle)?;
        debug!(
            bundle = %bundle.display(),
            binary = %binary.display(),
            "loading plugin module"
        );
        let library = unsafe { Library::new(&binary) }
            .map_err(|err| HostError::module_load(bundle, ModuleLoadReason::Dlopen(err)))?;

        #[cfg(target_os = "macos")]
        let bundle_ref = match enter_module(&library, bundle) {
            Ok(handle) => handle,
            Err(reason) => return Err(HostError::module_load(bundle, reason)),
        };
        #[cfg(not(target_os = "macos"))]
        if let Err(reason) = enter_module(&library, bundle) {
            return Err(HostError::module_load(bundle, reason));
        }

        let factory = match unsafe { fetch_factory(&library) } {
            Ok(factory) => factory,
            Err(reason) => {
                run_module_exit(&library);
                return Err(HostError::module_load(bundle, reason));
            }
        };

        Ok(Self {
            bundle: bundle.to_path_buf(),
            binary,
            factory: ManuallyDrop::new(factory),
            #[cfg(target_os = "macos")]
            _bundle_ref: bundle_ref,
            library,
        })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary
    }

    /// Enumerates the factory's classes, skipping entries whose info call
    /// fails.
    pub fn classes(&self) -> Vec<ClassInfo> {
        let factory = &*self.factory;
        let count = unsafe { (factory.vtbl().count_classes)(factory.as_ptr()) };
        let mut out = Vec::with_capacity(count.max(0) as usize);
        for index in 0..count {
            let mut info = PClassInfo::zeroed();
            let rc = unsafe { (factory.vtbl().get_class_info)(factory.as_ptr(), index, &mut info) };
            if rc != abi::K_RESULT_OK {
                debug!(index, rc, "skipping class with unreadable info");
                continue;
            }
            out.push(ClassInfo::from_raw(&info));
        }
        out
    }

    pub fn factory_info(&self) -> Option<FactoryInfo> {
        let factory = &*self.factory;
        let mut info = PFactoryInfo::zeroed();
        let rc = unsafe { (factory.vtbl().get_factory_info)(factory.as_ptr(), &mut info) };
        if rc != abi::K_RESULT_OK {
            return None;
        }
        Some(FactoryInfo {
            vendor: decode_cstr(&info.vendor),
            url: decode_cstr(&info.url),
        })
    }

    /// Asks the factory for a fresh object of `class` exposing interface `T`.
    ///
    /// # Safety
    ///
    /// The returned pointer is only dereferenced through the interface's
    /// declared vtable; `T` must match what the class actually implements.
    pub(crate) unsafe fn create_instance<T: Interface>(
        &self,
        class: &ClassId,
    ) -> Result<ComPtr<T>, i32> {
        let factory = &*self.factory;
        let mut obj: *mut c_void = std::ptr::null_mut();
        let rc = (factory.vtbl().create_instance)(
            factory.as_ptr(),
            class.as_tuid(),
            &T::IID,
            &mut obj,
        );
        if rc != abi::K_RESULT_OK {
            return Err(rc);
        }
        ComPtr::from_raw(obj.cast()).ok_or(abi::K_INTERNAL_ERROR)
    }
}

impl Drop for VstModule {
    fn drop(&mut self) {
        // Release every factory reference before the exit entry runs, and
        // both before the library is unloaded.
        unsafe {
            ManuallyDrop::drop(&mut self.factory);
        }
        run_module_exit(&self.library);
        debug!(bundle = %self.bundle.display(), "unloaded plugin module");
    }
}

/// Picks the audio-effect class to host, honoring an optional exact-name
/// filter. Controller classes are never selected.
pub fn select_effect_class(
    classes: &[ClassInfo],
    bundle: &Path,
    filter: Option<&str>,
) -> Result<ClassInfo, HostError> {
    match filter {
        Some(name) => classes
            .iter()
            .find(|class| class.is_audio_effect() && class.name == name)
            .cloned()
            .ok_or_else(|| HostError::ClassNotFound {
                name: name.to_owned(),
                path: bundle.to_path_buf(),
            }),
        None => classes
            .iter()
            .find(|class| class.is_audio_effect())
            .cloned()
            .ok_or_else(|| HostError::NoEffectClass {
                path: bundle.to_path_buf(),
            }),
    }
}

/// Picks the class a session should host: a pre-resolved id when the
/// caller has one, otherwise the effect-class selection rules.
pub(crate) fn class_for_session(
    classes: &[ClassInfo],
    bundle: &Path,
    cid: Option<&ClassId>,
    filter: Option<&str>,
) -> Result<ClassInfo, HostError> {
    match cid {
        Some(cid) => classes
            .iter()
            .find(|info| &info.cid == cid)
            .cloned()
            .ok_or_else(|| HostError::ClassNotFound {
                name: cid.to_string(),
                path: bundle.to_path_buf(),
            }),
        None => select_effect_class(classes, bundle, filter),
    }
}

/// Loads `bundle` just long enough to resolve the hosted class id.
pub fn resolve_effect_class(bundle: &Path, filter: Option<&str>) -> Result<ClassId, HostError> {
    let module = VstModule::load(bundle)?;
    let class = select_effect_class(&module.classes(), bundle, filter)?;
    debug!(class = %class.cid, name = %class.name, "resolved effect class");
    Ok(class.cid)
}

fn decode_cstr(raw: &[std::ffi::c_char]) -> String {
    String::from_utf8_lossy(abi::read_cstr_bytes(raw)).into_owned()
}

fn resolve_binary(bundle: &Path) -> Result<PathBuf, HostError> {
    if bundle.is_file() {
        return Ok(bundle.to_path_buf());
    }
    let stem = bundle
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or_default();
    let candidate = binary_in_bundle(bundle, stem, std::env::consts::OS, std::env::consts::ARCH);
    if candidate.is_file() {
        Ok(candidate)
    } else {
        Err(HostError::module_load(
            bundle,
            ModuleLoadReason::MissingBinary(candidate),
        ))
    }
}

fn binary_in_bundle(bundle: &Path, stem: &str, os: &str, arch: &str) -> PathBuf {
    match os {
        "macos" => bundle.join("Contents").join("MacOS").join(stem),
        _ => bundle
            .join("Contents")
            .join(format!("{arch}-linux"))
            .join(format!("{stem}.so")),
    }
}

unsafe fn fetch_factory(library: &Library) -> Result<ComPtr<IPluginFactory>, ModuleLoadReason> {
    let get_factory = library
        .get::<abi::GetFactoryProc>(b"GetPluginFactory\0")
        .map_err(|_| ModuleLoadReason::MissingFactory)?;
    ComPtr::from_raw(get_factory()).ok_or(ModuleLoadReason::NullFactory)
}

#[cfg(target_os = "macos")]
fn enter_module(library: &Library, bundle: &Path) -> Result<Option<CFBundle>, ModuleLoadReason> {
    let entry = match unsafe { library.get::<abi::BundleEntryProc>(b"bundleEntry\0") } {
        Ok(entry) => entry,
        Err(_) => {
            warn!(bundle = %bundle.display(), "module exports no bundleEntry, continuing without it");
            return Ok(None);
        }
    };
    let cf_bundle = CFURL::from_path(bundle, bundle.is_dir()).and_then(CFBundle::new);
    let bundle_ref = cf_bundle
        .as_ref()
        .map(|b| b.as_concrete_TypeRef() as *mut c_void)
        .unwrap_or(std::ptr::null_mut());
    if unsafe { entry(bundle_ref) } {
        Ok(cf_bundle)
    } else {
        Err(ModuleLoadReason::EntryRejected)
    }
}

#[cfg(target_os = "linux")]
fn enter_module(library: &Library, bundle: &Path) -> Result<(), ModuleLoadReason> {
    let entry = match unsafe { library.get::<abi::ModuleEntryProc>(b"ModuleEntry\0") } {
        Ok(entry) => entry,
        Err(_) => {
            warn!(bundle = %bundle.display(), "module exports no ModuleEntry, continuing without it");
            return Ok(());
        }
    };
    if unsafe { entry(std::ptr::null_mut()) } {
        Ok(())
    } else {
        Err(ModuleLoadReason::EntryRejected)
    }
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn enter_module(_library: &Library, _bundle: &Path) -> Result<(), ModuleLoadReason> {
    Ok(())
}

fn run_module_exit(library: &Library) {
    unsafe {
        #[cfg(target_os = "macos")]
        if let Ok(exit) = library.get::<abi::BundleExitProc>(b"bundleExit\0") {
            exit();
        }
        #[cfg(target_os = "linux")]
        if let Ok(exit) = library.get::<abi::ModuleExitProc>(b"ModuleExit\0") {
            exit();
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        let _ = library;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn class(name: &str, category: &str) -> ClassInfo {
        ClassInfo {
            cid: ClassId::from_tuid(abi::uid(1, 2, 3, name.len() as u32)),
            cardinality: abi::CLASS_CARDINALITY_MANY_INSTANCES,
            category: category.to_owned(),
            name: name.to_owned(),
        }
    }

    #[test]
    fn bundle_binary_layout_macos() {
        let path = binary_in_bundle(Path::new("/tmp/Surge.vst3"), "Surge", "macos", "aarch64");
        assert_eq!(path, Path::new("/tmp/Surge.vst3/Contents/MacOS/Surge"));
    }

    #[test]
    fn bundle_binary_layout_linux() {
        let path = binary_in_bundle(Path::new("/tmp/Surge.vst3"), "Surge", "linux", "x86_64");
        assert_eq!(
            path,
            Path::new("/tmp/Surge.vst3/Contents/x86_64-linux/Surge.so")
        );
    }

    #[test]
    fn flat_files_are_loaded_directly() {
        let dir = tempfile::tempdir().expect("tempdir");
        let flat = dir.path().join("plain.vst3");
        std::fs::write(&flat, b"not really a dylib").expect("write");
        assert_eq!(resolve_binary(&flat).expect("resolve"), flat);
    }

    #[test]
    fn empty_bundle_reports_missing_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("Empty.vst3");
        std::fs::create_dir_all(&bundle).expect("mkdir");
        let err = resolve_binary(&bundle).expect_err("must fail");
        match err {
            HostError::ModuleLoad {
                reason: ModuleLoadReason::MissingBinary(path),
                ..
            } => assert!(path.starts_with(&bundle)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn select_prefers_first_effect_class() {
        let classes = vec![
            class("Tuner Controller", abi::KIND_COMPONENT_CONTROLLER_CLASS),
            class("Tuner", abi::KIND_AUDIO_MODULE_CLASS),
            class("Tuner XL", abi::KIND_AUDIO_MODULE_CLASS),
        ];
        let picked = select_effect_class(&classes, Path::new("/x.vst3"), None).expect("select");
        assert_eq!(picked.name, "Tuner");
    }

    #[test]
    fn select_with_filter_matches_exact_name() {
        let classes = vec![
            class("Tuner", abi::KIND_AUDIO_MODULE_CLASS),
            class("Tuner XL", abi::KIND_AUDIO_MODULE_CLASS),
        ];
        let picked =
            select_effect_class(&classes, Path::new("/x.vst3"), Some("Tuner XL")).expect("select");
        assert_eq!(picked.name, "Tuner XL");
    }

    #[test]
    fn filter_never_matches_controller_classes() {
        let classes = vec![class("Tuner", abi::KIND_COMPONENT_CONTROLLER_CLASS)];
        let err = select_effect_class(&classes, Path::new("/x.vst3"), Some("Tuner"))
            .expect_err("controllers are not hostable");
        assert!(matches!(err, HostError::ClassNotFound { name, .. } if name == "Tuner"));
    }

    #[test]
    fn missing_effect_class_is_reported() {
        let err = select_effect_class(&[], Path::new("/x.vst3"), None).expect_err("empty factory");
        assert!(matches!(err, HostError::NoEffectClass { .. }));
    }

    #[test]
    fn class_id_formats_as_hex() {
        let id = ClassId::from_tuid(abi::uid(0x00010203, 0x04050607, 0x08090A0B, 0x0C0D0E0F));
        assert_eq!(id.to_string(), "000102030405060708090A0B0C0D0E0F");
    }
}
