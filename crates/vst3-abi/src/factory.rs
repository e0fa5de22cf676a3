//! Plugin factory interface and the module entry points that expose it.

use core::ffi::{c_char, c_void};

use crate::base::{impl_interface, uid, FUnknownVtbl, Tresult, TUID};

/// `PClassInfo::category` value for hostable audio effects.
pub const KIND_AUDIO_MODULE_CLASS: &str = "Audio Module Class";
/// `PClassInfo::category` value for split edit controllers.
pub const KIND_COMPONENT_CONTROLLER_CLASS: &str = "Component Controller Class";

pub const CLASS_CARDINALITY_MANY_INSTANCES: i32 = 0x7FFF_FFFF;
pub const FACTORY_FLAG_UNICODE: i32 = 1 << 4;

#[repr(C)]
pub struct PFactoryInfo {
    pub vendor: [c_char; 64],
    pub url: [c_char; 256],
    pub email: [c_char; 128],
    pub flags: i32,
}

impl PFactoryInfo {
    pub const fn zeroed() -> Self {
        Self {
            vendor: [0; 64],
            url: [0; 256],
            email: [0; 128],
            flags: 0,
        }
    }
}

#[repr(C)]
pub struct PClassInfo {
    pub cid: TUID,
    pub cardinality: i32,
    pub category: [c_char; 32],
    pub name: [c_char; 64],
}

impl PClassInfo {
    pub const fn zeroed() -> Self {
        Self {
            cid: [0; 16],
            cardinality: 0,
            category: [0; 32],
            name: [0; 64],
        }
    }
}

#[repr(C)]
pub struct IPluginFactoryVtbl {
    pub base: FUnknownVtbl,
    pub get_factory_info:
        unsafe extern "system" fn(this: *mut IPluginFactory, info: *mut PFactoryInfo) -> Tresult,
    pub count_classes: unsafe extern "system" fn(this: *mut IPluginFactory) -> i32,
    pub get_class_info: unsafe extern "system" fn(
        this: *mut IPluginFactory,
        index: i32,
        info: *mut PClassInfo,
    ) -> Tresult,
    pub create_instance: unsafe extern "system" fn(
        this: *mut IPluginFactory,
        cid: *const TUID,
        iid: *const TUID,
        obj: *mut *mut c_void,
    ) -> Tresult,
}

#[repr(C)]
pub struct IPluginFactory {
    pub vtbl: *const IPluginFactoryVtbl,
}

impl_interface!(
    IPluginFactory,
    IPluginFactoryVtbl,
    uid(0x7A4D811C, 0x52114A1F, 0xAED9D2EE, 0x0B43BF9F)
);

/// `GetPluginFactory`, exported by every VST3 module.
pub type GetFactoryProc = unsafe extern "system" fn() -> *mut IPluginFactory;

/// `bundleEntry(CFBundleRef)` on macOS.
pub type BundleEntryProc = unsafe extern "system" fn(bundle: *mut c_void) -> bool;
/// `bundleExit()` on macOS.
pub type BundleExitProc = unsafe extern "system" fn() -> bool;
/// `ModuleEntry(void*)` on Linux.
pub type ModuleEntryProc = unsafe extern "system" fn(handle: *mut c_void) -> bool;
/// `ModuleExit()` on Linux.
pub type ModuleExitProc = unsafe extern "system" fn() -> bool;
