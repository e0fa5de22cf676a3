//! A real, loadable VST3 module for exercising the screenshot host.
//!
//! The library builds as a `cdylib` exporting the standard module entry
//! points, and as an rlib exposing the class ids and names integration
//! tests match against. The plugin itself is deliberately dull: a stereo
//! shell with a split controller whose editor is a fixed 600x400 test card.

use std::ffi::c_void;

use vst3_abi::{uid, IPluginFactory, TUID};

mod com;
mod component;
mod controller;
mod factory;
mod view;

/// Identity the factory reports.
pub const VENDOR: &str = "Plugshot Project";
pub const VENDOR_URL: &str = "https://plugshot.example";
pub const VENDOR_EMAIL: &str = "fixture@plugshot.example";

/// Class names as they appear in the factory's class table.
pub const EFFECT_CLASS_NAME: &str = "Plugshot Static Fixture";
pub const CONTROLLER_CLASS_NAME: &str = "Plugshot Static Fixture Controller";

/// Editor size the view reports and refuses to change.
pub const VIEW_WIDTH: i32 = 600;
pub const VIEW_HEIGHT: i32 = 400;

pub const EFFECT_CID: TUID = uid(0x5A1C3E7B, 0x94D24F6E, 0x8A21C4D9, 0x33F0B1E5);
pub const CONTROLLER_CID: TUID = uid(0x6B2D4F8C, 0xA5E35071, 0x9B32D5EA, 0x44A1C2F6);

#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn GetPluginFactory() -> *mut IPluginFactory {
    factory::factory_ptr()
}

#[cfg(target_os = "macos")]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn bundleEntry(_bundle: *mut c_void) -> bool {
    true
}

#[cfg(target_os = "macos")]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn bundleExit() -> bool {
    true
}

#[cfg(not(target_os = "macos"))]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn ModuleEntry(_handle: *mut c_void) -> bool {
    true
}

#[cfg(not(target_os = "macos"))]
#[no_mangle]
#[allow(non_snake_case)]
pub extern "system" fn ModuleExit() -> bool {
    true
}
