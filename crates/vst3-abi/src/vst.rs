//! Component/controller interfaces plus the host-side callbacks they expect.

use core::ffi::{c_char, c_void};

use crate::base::{
    impl_interface, uid, FUnknownVtbl, IPluginBaseVtbl, String128, TBool, Tresult, TUID,
};

pub type ParamID = u32;
pub type ParamValue = f64;

pub const MEDIA_TYPE_AUDIO: i32 = 0;
pub const MEDIA_TYPE_EVENT: i32 = 1;
pub const DIRECTION_INPUT: i32 = 0;
pub const DIRECTION_OUTPUT: i32 = 1;
pub const BUS_TYPE_MAIN: i32 = 0;
pub const BUS_FLAG_DEFAULT_ACTIVE: u32 = 1 << 0;

/// State stream; never driven by this host, declared for signatures only.
#[repr(C)]
pub struct IBStream {
    _opaque: [u8; 0],
}

/// Connection message; never sent by this host.
#[repr(C)]
pub struct IMessage {
    _opaque: [u8; 0],
}

#[repr(C)]
pub struct BusInfo {
    pub media_type: i32,
    pub direction: i32,
    pub channel_count: i32,
    pub name: String128,
    pub bus_type: i32,
    pub flags: u32,
}

impl BusInfo {
    pub const fn zeroed() -> Self {
        Self {
            media_type: 0,
            direction: 0,
            channel_count: 0,
            name: [0; 128],
            bus_type: 0,
            flags: 0,
        }
    }
}

#[repr(C)]
pub struct RoutingInfo {
    pub media_type: i32,
    pub bus_index: i32,
    pub channel: i32,
}

#[repr(C)]
pub struct ParameterInfo {
    pub id: ParamID,
    pub title: String128,
    pub short_title: String128,
    pub units: String128,
    pub step_count: i32,
    pub default_normalized_value: ParamValue,
    pub unit_id: i32,
    pub flags: i32,
}

#[repr(C)]
pub struct IComponentVtbl {
    pub base: IPluginBaseVtbl,
    pub get_controller_class_id:
        unsafe extern "system" fn(this: *mut IComponent, class_id: *mut TUID) -> Tresult,
    pub set_io_mode: unsafe extern "system" fn(this: *mut IComponent, mode: i32) -> Tresult,
    pub get_bus_count: unsafe extern "system" fn(
        this: *mut IComponent,
        media_type: i32,
        direction: i32,
    ) -> i32,
    pub get_bus_info: unsafe extern "system" fn(
        this: *mut IComponent,
        media_type: i32,
        direction: i32,
        index: i32,
        info: *mut BusInfo,
    ) -> Tresult,
    pub get_routing_info: unsafe extern "system" fn(
        this: *mut IComponent,
        in_info: *mut RoutingInfo,
        out_info: *mut RoutingInfo,
    ) -> Tresult,
    pub activate_bus: unsafe extern "system" fn(
        this: *mut IComponent,
        media_type: i32,
        direction: i32,
        index: i32,
        state: TBool,
    ) -> Tresult,
    pub set_active: unsafe extern "system" fn(this: *mut IComponent, state: TBool) -> Tresult,
    pub set_state:
        unsafe extern "system" fn(this: *mut IComponent, state: *mut IBStream) -> Tresult,
    pub get_state:
        unsafe extern "system" fn(this: *mut IComponent, state: *mut IBStream) -> Tresult,
}

#[repr(C)]
pub struct IComponent {
    pub vtbl: *const IComponentVtbl,
}

impl_interface!(
    IComponent,
    IComponentVtbl,
    uid(0xE831FF31, 0xF2D54301, 0x928EBBEE, 0x25697802)
);

#[repr(C)]
pub struct IEditControllerVtbl {
    pub base: IPluginBaseVtbl,
    pub set_component_state:
        unsafe extern "system" fn(this: *mut IEditController, state: *mut IBStream) -> Tresult,
    pub set_state:
        unsafe extern "system" fn(this: *mut IEditController, state: *mut IBStream) -> Tresult,
    pub get_state:
        unsafe extern "system" fn(this: *mut IEditController, state: *mut IBStream) -> Tresult,
    pub get_parameter_count: unsafe extern "system" fn(this: *mut IEditController) -> i32,
    pub get_parameter_info: unsafe extern "system" fn(
        this: *mut IEditController,
        index: i32,
        info: *mut ParameterInfo,
    ) -> Tresult,
    pub get_param_string_by_value: unsafe extern "system" fn(
        this: *mut IEditController,
        id: ParamID,
        value: ParamValue,
        string: *mut String128,
    ) -> Tresult,
    pub get_param_value_by_string: unsafe extern "system" fn(
        this: *mut IEditController,
        id: ParamID,
        string: *const i16,
        value: *mut ParamValue,
    ) -> Tresult,
    pub normalized_param_to_plain: unsafe extern "system" fn(
        this: *mut IEditController,
        id: ParamID,
        value: ParamValue,
    ) -> ParamValue,
    pub plain_param_to_normalized: unsafe extern "system" fn(
        this: *mut IEditController,
        id: ParamID,
        value: ParamValue,
    ) -> ParamValue,
    pub get_param_normalized:
        unsafe extern "system" fn(this: *mut IEditController, id: ParamID) -> ParamValue,
    pub set_param_normalized: unsafe extern "system" fn(
        this: *mut IEditController,
        id: ParamID,
        value: ParamValue,
    ) -> Tresult,
    pub set_component_handler: unsafe extern "system" fn(
        this: *mut IEditController,
        handler: *mut IComponentHandler,
    ) -> Tresult,
    pub create_view: unsafe extern "system" fn(
        this: *mut IEditController,
        name: *const c_char,
    ) -> *mut crate::gui::IPlugView,
}

#[repr(C)]
pub struct IEditController {
    pub vtbl: *const IEditControllerVtbl,
}

impl_interface!(
    IEditController,
    IEditControllerVtbl,
    uid(0xDCD7BBE3, 0x7742448D, 0xA874AACC, 0x979C759E)
);

#[repr(C)]
pub struct IComponentHandlerVtbl {
    pub base: FUnknownVtbl,
    pub begin_edit:
        unsafe extern "system" fn(this: *mut IComponentHandler, id: ParamID) -> Tresult,
    pub perform_edit: unsafe extern "system" fn(
        this: *mut IComponentHandler,
        id: ParamID,
        value_normalized: ParamValue,
    ) -> Tresult,
    pub end_edit: unsafe extern "system" fn(this: *mut IComponentHandler, id: ParamID) -> Tresult,
    pub restart_component:
        unsafe extern "system" fn(this: *mut IComponentHandler, flags: i32) -> Tresult,
}

#[repr(C)]
pub struct IComponentHandler {
    pub vtbl: *const IComponentHandlerVtbl,
}

impl_interface!(
    IComponentHandler,
    IComponentHandlerVtbl,
    uid(0x93A0BEA3, 0x0BD045DB, 0x8E890B0C, 0xC1E46AC6)
);

#[repr(C)]
pub struct IHostApplicationVtbl {
    pub base: FUnknownVtbl,
    pub get_name:
        unsafe extern "system" fn(this: *mut IHostApplication, name: *mut String128) -> Tresult,
    pub create_instance: unsafe extern "system" fn(
        this: *mut IHostApplication,
        cid: *mut TUID,
        iid: *mut TUID,
        obj: *mut *mut c_void,
    ) -> Tresult,
}

#[repr(C)]
pub struct IHostApplication {
    pub vtbl: *const IHostApplicationVtbl,
}

impl_interface!(
    IHostApplication,
    IHostApplicationVtbl,
    uid(0x58E595CC, 0xDB2D4969, 0x8B6AAF8C, 0x36A664E5)
);

#[repr(C)]
pub struct IConnectionPointVtbl {
    pub base: FUnknownVtbl,
    pub connect: unsafe extern "system" fn(
        this: *mut IConnectionPoint,
        other: *mut IConnectionPoint,
    ) -> Tresult,
    pub disconnect: unsafe extern "system" fn(
        this: *mut IConnectionPoint,
        other: *mut IConnectionPoint,
    ) -> Tresult,
    pub notify:
        unsafe extern "system" fn(this: *mut IConnectionPoint, message: *mut IMessage) -> Tresult,
}

#[repr(C)]
pub struct IConnectionPoint {
    pub vtbl: *const IConnectionPointVtbl,
}

impl_interface!(
    IConnectionPoint,
    IConnectionPointVtbl,
    uid(0x70A4156F, 0x6E6E4026, 0x989148BF, 0xAA60D8D1)
);
