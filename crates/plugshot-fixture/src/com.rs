//! `FUnknown` shims shared by the fixture's exported objects.
//!
//! Every object handed out by the factory is a `#[repr(C)]` box whose first
//! field is its vtable pointer and which carries a `refs: AtomicU32` count.
//! The macro below stamps out the three `FUnknown` slots for such a type.

/// Declares `queryInterface`/`addRef`/`release` shims for `$ty`.
///
/// `queryInterface` answers `FUnknown` plus every interface listed in the
/// bracket with `this` itself; `release` drops the box when the count
/// reaches zero.
macro_rules! fixture_unknown {
    ($ty:ty, $query:ident, $add_ref:ident, $release:ident, [$($iface:ty),+ $(,)?]) => {
        unsafe extern "system" fn $query(
            this: *mut ::core::ffi::c_void,
            iid: *const ::vst3_abi::TUID,
            obj: *mut *mut ::core::ffi::c_void,
        ) -> ::vst3_abi::Tresult {
            if this.is_null() || iid.is_null() || obj.is_null() {
                return ::vst3_abi::K_INVALID_ARGUMENT;
            }
            let requested = &*iid;
            let known = ::vst3_abi::iid_eq(
                requested,
                &<::vst3_abi::FUnknown as ::vst3_abi::Interface>::IID,
            ) $(|| ::vst3_abi::iid_eq(
                requested,
                &<$iface as ::vst3_abi::Interface>::IID,
            ))+;
            if !known {
                *obj = ::core::ptr::null_mut();
                return ::vst3_abi::K_NO_INTERFACE;
            }
            (*this.cast::<$ty>())
                .refs
                .fetch_add(1, ::core::sync::atomic::Ordering::Relaxed);
            *obj = this;
            ::vst3_abi::K_RESULT_OK
        }

        unsafe extern "system" fn $add_ref(this: *mut ::core::ffi::c_void) -> u32 {
            (*this.cast::<$ty>())
                .refs
                .fetch_add(1, ::core::sync::atomic::Ordering::Relaxed)
                + 1
        }

        unsafe extern "system" fn $release(this: *mut ::core::ffi::c_void) -> u32 {
            let remaining = (*this.cast::<$ty>())
                .refs
                .fetch_sub(1, ::core::sync::atomic::Ordering::AcqRel)
                - 1;
            if remaining == 0 {
                drop(::std::boxed::Box::from_raw(this.cast::<$ty>()));
            }
            remaining
        }
    };
}
pub(crate) use fixture_unknown;
