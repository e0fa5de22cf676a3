//! Process-wide host context handed to plugins during `initialize`.

use std::ffi::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::debug;
use vst3_abi as abi;
use vst3_abi::{
    iid_eq, FUnknown, FUnknownVtbl, IHostApplication, IHostApplicationVtbl, Interface, String128,
    Tresult, TUID,
};

/// Name reported to plugins through `IHostApplication::getName`.
pub const HOST_NAME: &str = "Plugshot";

static ACTIVE_SESSIONS: AtomicUsize = AtomicUsize::new(0);

#[repr(C)]
struct HostApplicationObj {
    vtbl: *const IHostApplicationVtbl,
}

// The vtable pointer is immutable and points at another static.
unsafe impl Sync for HostApplicationObj {}

static HOST_APPLICATION_VTBL: IHostApplicationVtbl = IHostApplicationVtbl {
    base: FUnknownVtbl {
        query_interface: host_query_interface,
        add_ref: host_add_ref,
        release: host_release,
    },
    get_name: host_get_name,
    create_instance: host_create_instance,
};

static HOST_APPLICATION: HostApplicationObj = HostApplicationObj {
    vtbl: &HOST_APPLICATION_VTBL,
};

unsafe extern "system" fn host_query_interface(
    this: *mut c_void,
    iid: *const TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    if obj.is_null() || iid.is_null() {
        return abi::K_INVALID_ARGUMENT;
    }
    let requested = &*iid;
    if iid_eq(requested, &FUnknown::IID) || iid_eq(requested, &IHostApplication::IID) {
        *obj = this;
        abi::K_RESULT_OK
    } else {
        *obj = std::ptr::null_mut();
        abi::K_NO_INTERFACE
    }
}

// The context object lives in static storage, so the count is a formality.
unsafe extern "system" fn host_add_ref(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn host_release(_this: *mut c_void) -> u32 {
    1
}

unsafe extern "system" fn host_get_name(
    _this: *mut IHostApplication,
    name: *mut String128,
) -> Tresult {
    if name.is_null() {
        return abi::K_INVALID_ARGUMENT;
    }
    abi::write_string128(&mut *name, HOST_NAME);
    abi::K_RESULT_OK
}

unsafe extern "system" fn host_create_instance(
    _this: *mut IHostApplication,
    _cid: *mut TUID,
    _iid: *mut TUID,
    obj: *mut *mut c_void,
) -> Tresult {
    if !obj.is_null() {
        *obj = std::ptr::null_mut();
    }
    abi::K_NOT_IMPLEMENTED
}

/// Marks a hosting session as active for as long as the value lives.
///
/// The context pointer plugins receive in `initialize` is only handed out
/// through a guard, and the active count always returns to its previous
/// value when the guard drops, error paths included.
pub struct PluginContextGuard(());

impl PluginContextGuard {
    pub fn acquire() -> Self {
        let active = ACTIVE_SESSIONS.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(active, "host context acquired");
        Self(())
    }

    /// The `IHostApplication` the plugin sees, as the `FUnknown` that
    /// `IPluginBase::initialize` expects.
    pub fn context_ptr(&self) -> *mut FUnknown {
        (&HOST_APPLICATION as *const HostApplicationObj)
            .cast_mut()
            .cast()
    }
}

impl Drop for PluginContextGuard {
    fn drop(&mut self) {
        let active = ACTIVE_SESSIONS.fetch_sub(1, Ordering::AcqRel) - 1;
        debug!(active, "host context released");
    }
}

/// Number of live hosting sessions. Returns to zero after every capture,
/// which teardown tests assert.
pub fn active_sessions() -> usize {
    ACTIVE_SESSIONS.load(Ordering::Acquire)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    // The counter is process-wide, so tests touching it must not interleave.
    static COUNTER_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn guard_balances_the_session_count() {
        let _serial = COUNTER_LOCK.lock();
        let before = active_sessions();
        {
            let _one = PluginContextGuard::acquire();
            let _two = PluginContextGuard::acquire();
            assert_eq!(active_sessions(), before + 2);
        }
        assert_eq!(active_sessions(), before);
    }

    #[test]
    fn context_answers_host_application_queries() {
        let _serial = COUNTER_LOCK.lock();
        let guard = PluginContextGuard::acquire();
        let unknown = guard.context_ptr();
        unsafe {
            let mut obj: *mut c_void = std::ptr::null_mut();
            let rc = ((*(*unknown).vtbl).query_interface)(
                unknown.cast(),
                &IHostApplication::IID,
                &mut obj,
            );
            assert_eq!(rc, abi::K_RESULT_OK);
            let host = obj.cast::<IHostApplication>();

            let mut name: String128 = [0; 128];
            let rc = ((*(*host).vtbl).get_name)(host, &mut name);
            assert_eq!(rc, abi::K_RESULT_OK);
            let units: Vec<u16> = name
                .iter()
                .take_while(|&&c| c != 0)
                .map(|&c| c as u16)
                .collect();
            assert_eq!(String::from_utf16(&units).unwrap(), HOST_NAME);

            let mut cid: TUID = [0; 16];
            let mut iid: TUID = [0; 16];
            let mut out: *mut c_void = std::ptr::null_mut();
            let rc = ((*(*host).vtbl).create_instance)(host, &mut cid, &mut iid, &mut out);
            assert_eq!(rc, abi::K_NOT_IMPLEMENTED);
            assert!(out.is_null());
        }
    }

    #[test]
    fn unknown_interfaces_are_refused() {
        let _serial = COUNTER_LOCK.lock();
        let guard = PluginContextGuard::acquire();
        let unknown = guard.context_ptr();
        unsafe {
            let bogus = abi::uid(1, 2, 3, 4);
            let mut obj: *mut c_void = std::ptr::null_mut();
            let rc = ((*(*unknown).vtbl).query_interface)(unknown.cast(), &bogus, &mut obj);
            assert_eq!(rc, abi::K_NO_INTERFACE);
            assert!(obj.is_null());
        }
    }
}
