//! The fixture's split edit controller.
//!
//! It exposes no parameters; its whole purpose is to answer `createView`
//! for the `editor` view type and to hold the host's component handler.

use std::ffi::{c_char, CStr};
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use vst3_abi as abi;
use vst3_abi::{
    FUnknown, IBStream, IComponentHandler, IEditController, IEditControllerVtbl, IPlugView,
    IPluginBase, ParamID, ParamValue, ParameterInfo, String128, Tresult, K_INVALID_ARGUMENT,
    K_RESULT_OK,
};

use crate::com::fixture_unknown;
use crate::view::FixtureView;

#[repr(C)]
pub(crate) struct FixtureController {
    vtbl: *const IEditControllerVtbl,
    refs: AtomicU32,
    handler: AtomicPtr<IComponentHandler>,
}

impl FixtureController {
    /// Boxes a fresh controller with one reference owned by the caller.
    pub(crate) fn create() -> *mut std::ffi::c_void {
        let boxed = Box::new(Self {
            vtbl: &CONTROLLER_VTBL,
            refs: AtomicU32::new(1),
            handler: AtomicPtr::new(ptr::null_mut()),
        });
        Box::into_raw(boxed).cast()
    }

    fn swap_handler(&self, next: *mut IComponentHandler) {
        let previous = self.handler.swap(next, Ordering::AcqRel);
        if !previous.is_null() {
            unsafe { ((*(*previous).vtbl).base.release)(previous.cast()) };
        }
    }
}

impl Drop for FixtureController {
    fn drop(&mut self) {
        self.swap_handler(ptr::null_mut());
    }
}

fixture_unknown!(
    FixtureController,
    controller_query,
    controller_add_ref,
    controller_release,
    [IEditController, IPluginBase]
);

unsafe extern "system" fn controller_initialize(
    _this: *mut IPluginBase,
    _context: *mut FUnknown,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn controller_terminate(this: *mut IPluginBase) -> Tresult {
    (*this.cast::<FixtureController>()).swap_handler(ptr::null_mut());
    K_RESULT_OK
}

unsafe extern "system" fn controller_set_component_state(
    _this: *mut IEditController,
    _state: *mut IBStream,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn controller_set_state(
    _this: *mut IEditController,
    _state: *mut IBStream,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn controller_get_state(
    _this: *mut IEditController,
    _state: *mut IBStream,
) -> Tresult {
    K_RESULT_OK
}

unsafe extern "system" fn controller_get_parameter_count(_this: *mut IEditController) -> i32 {
    0
}

unsafe extern "system" fn controller_get_parameter_info(
    _this: *mut IEditController,
    _index: i32,
    _info: *mut ParameterInfo,
) -> Tresult {
    K_INVALID_ARGUMENT
}

unsafe extern "system" fn controller_get_param_string_by_value(
    _this: *mut IEditController,
    _id: ParamID,
    _value: ParamValue,
    _string: *mut String128,
) -> Tresult {
    K_INVALID_ARGUMENT
}

unsafe extern "system" fn controller_get_param_value_by_string(
    _this: *mut IEditController,
    _id: ParamID,
    _string: *const i16,
    _value: *mut ParamValue,
) -> Tresult {
    K_INVALID_ARGUMENT
}

unsafe extern "system" fn controller_normalized_param_to_plain(
    _this: *mut IEditController,
    _id: ParamID,
    value: ParamValue,
) -> ParamValue {
    value
}

unsafe extern "system" fn controller_plain_param_to_normalized(
    _this: *mut IEditController,
    _id: ParamID,
    value: ParamValue,
) -> ParamValue {
    value
}

unsafe extern "system" fn controller_get_param_normalized(
    _this: *mut IEditController,
    _id: ParamID,
) -> ParamValue {
    0.0
}

unsafe extern "system" fn controller_set_param_normalized(
    _this: *mut IEditController,
    _id: ParamID,
    _value: ParamValue,
) -> Tresult {
    K_INVALID_ARGUMENT
}

unsafe extern "system" fn controller_set_component_handler(
    this: *mut IEditController,
    handler: *mut IComponentHandler,
) -> Tresult {
    if !handler.is_null() {
        ((*(*handler).vtbl).base.add_ref)(handler.cast());
    }
    (*this.cast::<FixtureController>()).swap_handler(handler);
    K_RESULT_OK
}

unsafe extern "system" fn controller_create_view(
    _this: *mut IEditController,
    name: *const c_char,
) -> *mut IPlugView {
    if name.is_null() {
        return ptr::null_mut();
    }
    if CStr::from_ptr(name).to_bytes() != abi::VIEW_TYPE_EDITOR.as_bytes() {
        return ptr::null_mut();
    }
    FixtureView::create()
}

static CONTROLLER_VTBL: IEditControllerVtbl = IEditControllerVtbl {
    base: abi::IPluginBaseVtbl {
        base: abi::FUnknownVtbl {
            query_interface: controller_query,
            add_ref: controller_add_ref,
            release: controller_release,
        },
        initialize: controller_initialize,
        terminate: controller_terminate,
    },
    set_component_state: controller_set_component_state,
    set_state: controller_set_state,
    get_state: controller_get_state,
    get_parameter_count: controller_get_parameter_count,
    get_parameter_info: controller_get_parameter_info,
    get_param_string_by_value: controller_get_param_string_by_value,
    get_param_value_by_string: controller_get_param_value_by_string,
    normalized_param_to_plain: controller_normalized_param_to_plain,
    plain_param_to_normalized: controller_plain_param_to_normalized,
    get_param_normalized: controller_get_param_normalized,
    set_param_normalized: controller_set_param_normalized,
    set_component_handler: controller_set_component_handler,
    create_view: controller_create_view,
};

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn create_view_only_knows_the_editor_type() {
        let controller = FixtureController::create().cast::<IEditController>();
        let vtbl = unsafe { &*(*controller).vtbl };
        let editor = CString::new(abi::VIEW_TYPE_EDITOR).expect("view type");
        let other = CString::new("inspector").expect("view type");
        unsafe {
            let view = (vtbl.create_view)(controller, editor.as_ptr());
            assert!(!view.is_null());
            ((*(*view).vtbl).base.release)(view.cast());

            assert!((vtbl.create_view)(controller, other.as_ptr()).is_null());
            assert!((vtbl.create_view)(controller, ptr::null()).is_null());
            (vtbl.base.base.release)(controller.cast());
        }
    }

    #[test]
    fn has_no_parameters() {
        let controller = FixtureController::create().cast::<IEditController>();
        let vtbl = unsafe { &*(*controller).vtbl };
        unsafe {
            assert_eq!((vtbl.get_parameter_count)(controller), 0);
            let mut info = std::mem::zeroed::<ParameterInfo>();
            assert_eq!(
                (vtbl.get_parameter_info)(controller, 0, &mut info),
                K_INVALID_ARGUMENT
            );
            (vtbl.base.base.release)(controller.cast());
        }
    }
}
