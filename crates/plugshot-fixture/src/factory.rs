//! The module's plugin factory: two classes, component and controller.

use std::ffi::c_void;
use std::ptr;

use vst3_abi as abi;
use vst3_abi::{
    iid_eq, write_cstr, FUnknown, FUnknownVtbl, IPluginFactory, IPluginFactoryVtbl, Interface,
    PClassInfo, PFactoryInfo, Tresult, TUID, K_INVALID_ARGUMENT, K_NO_INTERFACE, K_RESULT_OK,
};

use crate::component::FixtureComponent;
use crate::controller::FixtureController;
use crate::{
    CONTROLLER_CID, CONTROLLER_CLASS_NAME, EFFECT_CID, EFFECT_CLASS_NAME, VENDOR, VENDOR_EMAIL,
    VENDOR_URL,
};

/// The factory lives for the life of the module, so its reference count is
/// pinned and `addRef`/`release` are no-ops.
#[repr(C)]
struct FactoryObj {
    vtbl: *const IPluginFactoryVtbl,
}

// The vtable pointer is a static; sharing it across threads is fine.
unsafe impl Sync for FactoryObj {}

static FACTORY: FactoryObj = FactoryObj {
    vtbl: &FACTORY_VTBL,
};

pub(crate) fn factory_ptr() -> *mut IPluginFactory {
    (&FACTORY as *const FactoryObj).cast_mut().cast()
}

unsafe extern "system" fn factory_query(
    this: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    if this.is_null() || iid.is_null() || obj.is_null() {
        return K_INVALID_ARGUMENT;
    }
    let requested = &*iid;
    if iid_eq(requested, &FUnknown::IID) || iid_eq(requested, &IPluginFactory::IID) {
        *obj = this;
        K_RESULT_OK
    } else {
        *obj = ptr::null_mut();
        K_NO_INTERFACE
    }
}

unsafe extern "system" fn factory_add_ref(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn factory_release(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn factory_get_factory_info(
    _this: *mut IPluginFactory,
    info: *mut PFactoryInfo,
) -> Tresult {
    if info.is_null() {
        return K_INVALID_ARGUMENT;
    }
    *info = PFactoryInfo::zeroed();
    let info = &mut *info;
    write_cstr(&mut info.vendor, VENDOR);
    write_cstr(&mut info.url, VENDOR_URL);
    write_cstr(&mut info.email, VENDOR_EMAIL);
    info.flags = abi::FACTORY_FLAG_UNICODE;
    K_RESULT_OK
}

unsafe extern "system" fn factory_count_classes(_this: *mut IPluginFactory) -> i32 {
    2
}

unsafe extern "system" fn factory_get_class_info(
    _this: *mut IPluginFactory,
    index: i32,
    info: *mut PClassInfo,
) -> Tresult {
    if info.is_null() {
        return K_INVALID_ARGUMENT;
    }
    let (cid, category, name) = match index {
        0 => (EFFECT_CID, abi::KIND_AUDIO_MODULE_CLASS, EFFECT_CLASS_NAME),
        1 => (
            CONTROLLER_CID,
            abi::KIND_COMPONENT_CONTROLLER_CLASS,
            CONTROLLER_CLASS_NAME,
        ),
        _ => return K_INVALID_ARGUMENT,
    };
    *info = PClassInfo::zeroed();
    let info = &mut *info;
    info.cid = cid;
    info.cardinality = abi::CLASS_CARDINALITY_MANY_INSTANCES;
    write_cstr(&mut info.category, category);
    write_cstr(&mut info.name, name);
    K_RESULT_OK
}

unsafe extern "system" fn factory_create_instance(
    _this: *mut IPluginFactory,
    cid: *const TUID,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    if cid.is_null() || iid.is_null() || obj.is_null() {
        return K_INVALID_ARGUMENT;
    }
    *obj = ptr::null_mut();
    let cid = &*cid;
    let unknown = if iid_eq(cid, &EFFECT_CID) {
        FixtureComponent::create()
    } else if iid_eq(cid, &CONTROLLER_CID) {
        FixtureController::create()
    } else {
        return K_NO_INTERFACE;
    };
    query_and_release(unknown, iid, obj)
}

/// Queries `iid` on a freshly created object and drops the creation
/// reference, leaving the caller with exactly the reference the query took.
unsafe fn query_and_release(
    unknown: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    let vtbl = unknown.cast::<*const FUnknownVtbl>().read();
    let rc = ((*vtbl).query_interface)(unknown, iid, obj);
    ((*vtbl).release)(unknown);
    rc
}

static FACTORY_VTBL: IPluginFactoryVtbl = IPluginFactoryVtbl {
    base: FUnknownVtbl {
        query_interface: factory_query,
        add_ref: factory_add_ref,
        release: factory_release,
    },
    get_factory_info: factory_get_factory_info,
    count_classes: factory_count_classes,
    get_class_info: factory_get_class_info,
    create_instance: factory_create_instance,
};
