//! The fixture's processing component.
//!
//! A stereo-in/stereo-out shell that does no processing; it exists so the
//! host has a component to initialize and a controller class id to chase.

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::AtomicU32;

use vst3_abi as abi;
use vst3_abi::{
    write_string128, BusInfo, FUnknown, IBStream, IComponent, IComponentVtbl, IPluginBase, TBool,
    Tresult, RoutingInfo, TUID, K_INVALID_ARGUMENT, K_NOT_IMPLEMENTED, K_RESULT_OK,
};

use crate::com::fixture_unknown;
use crate::CONTROLLER_CID;

#[repr(C)]
pub(crate) struct FixtureComponent {
    vtbl: *const IComponentVtbl,
    refs: AtomicU32,
}

impl FixtureComponent {
    /// Boxes a fresh component with one reference owned by the caller.
    pub(crate) fn create() -> *mut c_void {
        let boxed = Box::new(Self {
            vtbl: &COMPONENT_VTBL,
            refs: AtomicU32::new(1),
        });
        Box::into_raw(boxed).cast()
    }
}

fixture_unknown!(
    FixtureComponent,
    component_query,
    component_add_ref,
    component_release,
    [IComponent, IPluginBase]
);

unsafe extern "system" fn component_initialize(
    _this: *mut IPluginBase,
    _context: *mut FUnknown,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn component_terminate(_this: *mut IPluginBase) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn component_get_controller_class_id(
    _this: *mut IComponent,
    class_id: *mut TUID,
) -> Tresult {
    if class_id.is_null() {
        return K_INVALID_ARGUMENT;
    }
    *class_id = CONTROLLER_CID;
    K_RESULT_OK
}

unsafe extern "system" fn component_set_io_mode(_this: *mut IComponent, _mode: i32) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn component_get_bus_count(
    _this: *mut IComponent,
    media_type: i32,
    direction: i32,
) -> i32 {
    if media_type == abi::MEDIA_TYPE_AUDIO
        && (direction == abi::DIRECTION_INPUT || direction == abi::DIRECTION_OUTPUT)
    {
        1
    } else {
        0
    }
}

unsafe extern "system" fn component_get_bus_info(
    _this: *mut IComponent,
    media_type: i32,
    direction: i32,
    index: i32,
    info: *mut BusInfo,
) -> Tresult {
    if info.is_null() {
        return K_INVALID_ARGUMENT;
    }
    if media_type != abi::MEDIA_TYPE_AUDIO || index != 0 {
        return K_INVALID_ARGUMENT;
    }
    let name = match direction {
        abi::DIRECTION_INPUT => "Stereo In",
        abi::DIRECTION_OUTPUT => "Stereo Out",
        _ => return K_INVALID_ARGUMENT,
    };
    let info = &mut *info;
    *info = BusInfo::zeroed();
    info.media_type = abi::MEDIA_TYPE_AUDIO;
    info.direction = direction;
    info.channel_count = 2;
    write_string128(&mut info.name, name);
    info.bus_type = abi::BUS_TYPE_MAIN;
    info.flags = abi::BUS_FLAG_DEFAULT_ACTIVE;
    K_RESULT_OK
}

unsafe extern "system" fn component_get_routing_info(
    _this: *mut IComponent,
    _in_info: *mut RoutingInfo,
    _out_info: *mut RoutingInfo,
) -> Tresult {
    K_NOT_IMPLEMENTED
}

unsafe extern "system" fn component_activate_bus(
    _this: *mut IComponent,
    media_type: i32,
    direction: i32,
    index: i32,
    _state: TBool,
) -> Tresult {
    if media_type == abi::MEDIA_TYPE_AUDIO
        && (direction == abi::DIRECTION_INPUT || direction == abi::DIRECTION_OUTPUT)
        && index == 0
    {
        K_RESULT_OK
    } else {
        K_INVALID_ARGUMENT
    }
}

unsafe extern "system" fn component_set_active(_this: *mut IComponent, _state: TBool) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn component_set_state(
    _this: *mut IComponent,
    _state: *mut IBStream,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn component_get_state(
    _this: *mut IComponent,
    _state: *mut IBStream,
) -> Tresult {
    K_RESULT_OK
}

static COMPONENT_VTBL: IComponentVtbl = IComponentVtbl {
    base: abi::IPluginBaseVtbl {
        base: abi::FUnknownVtbl {
            query_interface: component_query,
            add_ref: component_add_ref,
            release: component_release,
        },
        initialize: component_initialize,
        terminate: component_terminate,
    },
    get_controller_class_id: component_get_controller_class_id,
    set_io_mode: component_set_io_mode,
    get_bus_count: component_get_bus_count,
    get_bus_info: component_get_bus_info,
    get_routing_info: component_get_routing_info,
    activate_bus: component_activate_bus,
    set_active: component_set_active,
    set_state: component_set_state,
    get_state: component_get_state,
};
