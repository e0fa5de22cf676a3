//! Hand-maintained VST3 COM ABI surface.
//!
//! This crate declares the small slice of the VST3 module ABI that a
//! screenshot host and its test fixture actually touch: the factory and
//! component/controller interfaces, the editor view plumbing and the
//! host-side callback interfaces, together with the owning [`ComPtr`]
//! wrapper. Vtables are `#[repr(C)]` structs in SDK slot order with
//! `extern "system"` entries; interface IDs use the non-Windows byte
//! layout. It is not a complete SDK binding and does not try to be one.

#![cfg_attr(not(test), no_std)]

mod base;
mod factory;
mod gui;
mod vst;

pub use base::{
    iid_eq, read_cstr_bytes, uid, write_cstr, write_string128, ComPtr, FUnknown, FUnknownVtbl,
    IPluginBase, IPluginBaseVtbl, Interface, String128, TBool, TChar, Tresult, TUID,
    K_INTERNAL_ERROR, K_INVALID_ARGUMENT, K_NOT_IMPLEMENTED, K_NOT_INITIALIZED, K_NO_INTERFACE,
    K_OUT_OF_MEMORY, K_RESULT_FALSE, K_RESULT_OK, K_RESULT_TRUE,
};
pub use factory::{
    BundleEntryProc, BundleExitProc, GetFactoryProc, IPluginFactory, IPluginFactoryVtbl,
    ModuleEntryProc, ModuleExitProc, PClassInfo, PFactoryInfo, CLASS_CARDINALITY_MANY_INSTANCES,
    FACTORY_FLAG_UNICODE, KIND_AUDIO_MODULE_CLASS, KIND_COMPONENT_CONTROLLER_CLASS,
};
pub use gui::{
    IPlugFrame, IPlugFrameVtbl, IPlugView, IPlugViewVtbl, ViewRect, PLATFORM_TYPE_HWND,
    PLATFORM_TYPE_NSVIEW, PLATFORM_TYPE_X11_WINDOW, VIEW_TYPE_EDITOR,
};
pub use vst::{
    BusInfo, IBStream, IComponent, IComponentHandler, IComponentHandlerVtbl, IComponentVtbl,
    IConnectionPoint, IConnectionPointVtbl, IEditController, IEditControllerVtbl,
    IHostApplication, IHostApplicationVtbl, IMessage, ParamID, ParamValue, ParameterInfo,
    RoutingInfo, BUS_FLAG_DEFAULT_ACTIVE, BUS_TYPE_MAIN, DIRECTION_INPUT, DIRECTION_OUTPUT,
    MEDIA_TYPE_AUDIO, MEDIA_TYPE_EVENT,
};
