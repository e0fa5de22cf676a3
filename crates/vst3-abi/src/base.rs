//! Core ABI types shared by every interface: result codes, interface IDs,
//! the `FUnknown` root and the owning [`ComPtr`] wrapper.

use core::ffi::{c_char, c_void};
use core::ptr::NonNull;

/// VST3 result code. Zero is success on the platforms this crate targets.
pub type Tresult = i32;

pub const K_NO_INTERFACE: Tresult = -1;
pub const K_RESULT_OK: Tresult = 0;
pub const K_RESULT_TRUE: Tresult = 0;
pub const K_RESULT_FALSE: Tresult = 1;
pub const K_INVALID_ARGUMENT: Tresult = 2;
pub const K_NOT_IMPLEMENTED: Tresult = 3;
pub const K_INTERNAL_ERROR: Tresult = 4;
pub const K_NOT_INITIALIZED: Tresult = 5;
pub const K_OUT_OF_MEMORY: Tresult = 6;

/// 16-byte interface/class identifier.
pub type TUID = [u8; 16];

/// UTF-16 character as the SDK declares it.
pub type TChar = i16;

/// Fixed 128-character UTF-16 string buffer.
pub type String128 = [TChar; 128];

/// ABI boolean.
pub type TBool = u8;

/// Builds a TUID from four 32-bit words using the non-COM (non-Windows)
/// byte ordering: each word is laid out big-endian, words in sequence.
pub const fn uid(a: u32, b: u32, c: u32, d: u32) -> TUID {
    [
        (a >> 24) as u8,
        (a >> 16) as u8,
        (a >> 8) as u8,
        a as u8,
        (b >> 24) as u8,
        (b >> 16) as u8,
        (b >> 8) as u8,
        b as u8,
        (c >> 24) as u8,
        (c >> 16) as u8,
        (c >> 8) as u8,
        c as u8,
        (d >> 24) as u8,
        (d >> 16) as u8,
        (d >> 8) as u8,
        d as u8,
    ]
}

#[inline]
pub fn iid_eq(lhs: &TUID, rhs: &TUID) -> bool {
    lhs == rhs
}

/// Copies `text` into a NUL-terminated UTF-16 buffer, truncating to fit.
pub fn write_string128(dst: &mut String128, text: &str) {
    let mut i = 0;
    for unit in text.encode_utf16() {
        if i >= dst.len() - 1 {
            break;
        }
        dst[i] = unit as TChar;
        i += 1;
    }
    dst[i] = 0;
}

/// Copies `text` into a NUL-terminated C string buffer, truncating to fit.
pub fn write_cstr(dst: &mut [c_char], text: &str) {
    let mut i = 0;
    for byte in text.bytes() {
        if i >= dst.len() - 1 {
            break;
        }
        dst[i] = byte as c_char;
        i += 1;
    }
    if !dst.is_empty() {
        dst[i] = 0;
    }
}

/// Returns the bytes of a C string buffer up to its first NUL.
pub fn read_cstr_bytes(src: &[c_char]) -> &[u8] {
    let mut end = 0;
    while end < src.len() && src[end] != 0 {
        end += 1;
    }
    // c_char and u8 have identical layout.
    unsafe { core::slice::from_raw_parts(src.as_ptr().cast::<u8>(), end) }
}

#[repr(C)]
pub struct FUnknownVtbl {
    pub query_interface:
        unsafe extern "system" fn(this: *mut c_void, iid: *const TUID, obj: *mut *mut c_void) -> Tresult,
    pub add_ref: unsafe extern "system" fn(this: *mut c_void) -> u32,
    pub release: unsafe extern "system" fn(this: *mut c_void) -> u32,
}

/// Root of every VST3 interface, equivalent to COM `IUnknown`.
#[repr(C)]
pub struct FUnknown {
    pub vtbl: *const FUnknownVtbl,
}

#[repr(C)]
pub struct IPluginBaseVtbl {
    pub base: FUnknownVtbl,
    pub initialize:
        unsafe extern "system" fn(this: *mut IPluginBase, context: *mut FUnknown) -> Tresult,
    pub terminate: unsafe extern "system" fn(this: *mut IPluginBase) -> Tresult,
}

#[repr(C)]
pub struct IPluginBase {
    pub vtbl: *const IPluginBaseVtbl,
}

/// Marker for types that shape a VST3 COM interface.
///
/// # Safety
///
/// Implementors must be `#[repr(C)]` structs whose first field is the vtable
/// pointer, and the vtable's first three slots must be `FUnknown`'s.
pub unsafe trait Interface: Sized {
    type Vtbl: 'static;
    const IID: TUID;

    /// Reads the object's vtable. The pointer behind `self` must refer to a
    /// live COM object; [`ComPtr`] upholds that for its lifetime.
    fn vtbl(&self) -> &Self::Vtbl;
}

macro_rules! impl_interface {
    ($ty:ty, $vtbl:ty, $iid:expr) => {
        unsafe impl $crate::base::Interface for $ty {
            type Vtbl = $vtbl;
            const IID: $crate::base::TUID = $iid;

            fn vtbl(&self) -> &Self::Vtbl {
                unsafe { &*self.vtbl }
            }
        }
    };
}
pub(crate) use impl_interface;

impl_interface!(FUnknown, FUnknownVtbl, uid(0x00000000, 0x00000000, 0xC0000000, 0x00000046));
impl_interface!(IPluginBase, IPluginBaseVtbl, uid(0x22888DDB, 0x156E45AE, 0x8358B348, 0x08190625));

/// Owning pointer to a COM interface: `add_ref` on clone, `release` on drop.
pub struct ComPtr<T: Interface> {
    ptr: NonNull<T>,
}

impl<T: Interface> ComPtr<T> {
    /// Takes ownership of an already-counted interface pointer. Returns
    /// `None` for null.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object implementing `T` whose
    /// reference count already accounts for this pointer.
    pub unsafe fn from_raw(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Wraps a borrowed interface pointer, taking a new reference on it.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to a live object implementing `T`.
    pub unsafe fn adopt(ptr: *mut T) -> Option<Self> {
        let owned = Self::from_raw(ptr)?;
        ((*owned.unknown_vtbl()).add_ref)(owned.ptr.as_ptr().cast());
        Some(owned)
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn vtbl(&self) -> &T::Vtbl {
        unsafe { self.ptr.as_ref().vtbl() }
    }

    fn unknown_vtbl(&self) -> *const FUnknownVtbl {
        // Interface guarantees the vtable opens with the FUnknown slots.
        unsafe { (*self.ptr.as_ptr().cast::<FUnknown>()).vtbl }
    }

    /// Asks the object for another interface.
    pub fn cast<U: Interface>(&self) -> Option<ComPtr<U>> {
        let mut obj: *mut c_void = core::ptr::null_mut();
        let rc = unsafe {
            ((*self.unknown_vtbl()).query_interface)(
                self.ptr.as_ptr().cast(),
                &U::IID,
                &mut obj,
            )
        };
        if rc == K_RESULT_OK {
            unsafe { ComPtr::from_raw(obj.cast()) }
        } else {
            None
        }
    }
}

impl<T: Interface> Clone for ComPtr<T> {
    fn clone(&self) -> Self {
        unsafe {
            ((*self.unknown_vtbl()).add_ref)(self.ptr.as_ptr().cast());
        }
        Self { ptr: self.ptr }
    }
}

impl<T: Interface> Drop for ComPtr<T> {
    fn drop(&mut self) {
        unsafe {
            ((*self.unknown_vtbl()).release)(self.ptr.as_ptr().cast());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    // Minimal refcounted object for exercising ComPtr against a real vtable.
    #[repr(C)]
    struct Counted {
        vtbl: *const FUnknownVtbl,
        refs: AtomicU32,
        live: &'static AtomicU32,
    }

    static COUNTED_VTBL: FUnknownVtbl = FUnknownVtbl {
        query_interface: counted_query,
        add_ref: counted_add_ref,
        release: counted_release,
    };

    unsafe extern "system" fn counted_query(
        this: *mut c_void,
        iid: *const TUID,
        obj: *mut *mut c_void,
    ) -> Tresult {
        if iid_eq(&*iid, &FUnknown::IID) {
            counted_add_ref(this);
            *obj = this;
            K_RESULT_OK
        } else {
            *obj = core::ptr::null_mut();
            K_NO_INTERFACE
        }
    }

    unsafe extern "system" fn counted_add_ref(this: *mut c_void) -> u32 {
        let counted = &*this.cast::<Counted>();
        counted.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    unsafe extern "system" fn counted_release(this: *mut c_void) -> u32 {
        let left = {
            let counted = &*this.cast::<Counted>();
            counted.refs.fetch_sub(1, Ordering::AcqRel) - 1
        };
        if left == 0 {
            let counted = Box::from_raw(this.cast::<Counted>());
            counted.live.fetch_sub(1, Ordering::AcqRel);
        }
        left
    }

    fn make_counted(live: &'static AtomicU32) -> *mut FUnknown {
        live.fetch_add(1, Ordering::AcqRel);
        Box::into_raw(Box::new(Counted {
            vtbl: &COUNTED_VTBL,
            refs: AtomicU32::new(1),
            live,
        }))
        .cast()
    }

    #[test]
    fn uid_layout_is_big_endian_per_word() {
        let id = uid(0x7A4D811C, 0x52114A1F, 0xAED9D2EE, 0x0B43BF9F);
        assert_eq!(
            id,
            [
                0x7A, 0x4D, 0x81, 0x1C, 0x52, 0x11, 0x4A, 0x1F, 0xAE, 0xD9, 0xD2, 0xEE, 0x0B,
                0x43, 0xBF, 0x9F
            ]
        );
    }

    #[test]
    fn string128_round_trips_ascii() {
        let mut buf: String128 = [0x55; 128];
        write_string128(&mut buf, "editor host");
        let units: Vec<u16> = buf.iter().take_while(|&&c| c != 0).map(|&c| c as u16).collect();
        assert_eq!(String::from_utf16(&units).unwrap(), "editor host");
    }

    #[test]
    fn string128_truncates_with_terminator() {
        let long: String = core::iter::repeat('x').take(400).collect();
        let mut buf: String128 = [0; 128];
        write_string128(&mut buf, &long);
        assert_eq!(buf[127], 0);
        assert!(buf[..127].iter().all(|&c| c == 'x' as TChar));
    }

    #[test]
    fn cstr_read_stops_at_nul() {
        let mut buf = [0 as c_char; 8];
        write_cstr(&mut buf, "abc");
        assert_eq!(read_cstr_bytes(&buf), b"abc");
    }

    #[test]
    fn com_ptr_clone_and_drop_balance_refcounts() {
        static LIVE: AtomicU32 = AtomicU32::new(0);
        let raw = make_counted(&LIVE);
        {
            let owned = unsafe { ComPtr::<FUnknown>::from_raw(raw) }.unwrap();
            let second = owned.clone();
            let third = owned.cast::<FUnknown>().unwrap();
            drop(second);
            drop(third);
            assert_eq!(LIVE.load(Ordering::Acquire), 1);
        }
        assert_eq!(LIVE.load(Ordering::Acquire), 0);
    }

    #[test]
    fn com_ptr_from_raw_rejects_null() {
        assert!(unsafe { ComPtr::<FUnknown>::from_raw(core::ptr::null_mut()) }.is_none());
    }
}
