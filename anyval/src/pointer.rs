use std::ptr::NonNull;

use crate::error::VariantError;
use crate::ops::PointerOps;
use crate::storage::{Storable, StorageMode, TypeShape};

static_assertions::assert_eq_size!(Address, *const (), usize);
static_assertions::const_assert!(StorageMode::classify(TypeShape::pointer::<*const u8>()).is_non_owned_pointer());

/// An untyped, non-owned address held in a cell.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(*mut ());

impl Address {
    pub fn new<T>(ptr: *mut T) -> Self {
        Self(ptr.cast())
    }

    #[inline(always)]
    pub fn get(self) -> *mut () {
        self.0
    }

    #[inline(always)]
    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Thin raw pointer types, stored as their address.
///
/// A variant holding one of these hands out the pointer itself, never the pointee.
pub trait PointerRepr: Copy + sealed::Sealed + 'static {
    fn to_address(self) -> Address;

    /// Views the address held by a cell as this pointer type.
    fn view(address: &Address) -> &Self;

    fn view_mut(address: &mut Address) -> &mut Self;
}

/// # Safety
/// `P` must be a thin raw pointer type (or a transparent wrapper over one).
#[inline(always)]
unsafe fn reinterpret<P>(address: &Address) -> &P {
    &*(address as *const Address).cast::<P>()
}

/// # Safety
/// Same as [`reinterpret`].
#[inline(always)]
unsafe fn reinterpret_mut<P>(address: &mut Address) -> &mut P {
    &mut *(address as *mut Address).cast::<P>()
}

impl<T: 'static> sealed::Sealed for *const T {}
impl<T: 'static> sealed::Sealed for *mut T {}
impl<T: 'static> sealed::Sealed for NonNull<T> {}

impl<T: 'static> PointerRepr for *const T {
    fn to_address(self) -> Address {
        Address::new(self.cast_mut())
    }

    fn view(address: &Address) -> &Self {
        // SAFETY: `Address` is a transparent `*mut ()`, and thin pointers share one layout.
        unsafe { reinterpret(address) }
    }

    fn view_mut(address: &mut Address) -> &mut Self {
        // SAFETY: as above.
        unsafe { reinterpret_mut(address) }
    }
}

impl<T: 'static> PointerRepr for *mut T {
    fn to_address(self) -> Address {
        Address::new(self)
    }

    fn view(address: &Address) -> &Self {
        // SAFETY: `Address` is a transparent `*mut ()`, and thin pointers share one layout.
        unsafe { reinterpret(address) }
    }

    fn view_mut(address: &mut Address) -> &mut Self {
        // SAFETY: as above.
        unsafe { reinterpret_mut(address) }
    }
}

impl<T: 'static> PointerRepr for NonNull<T> {
    fn to_address(self) -> Address {
        Address::new(self.as_ptr())
    }

    fn view(address: &Address) -> &Self {
        debug_assert!(!address.is_null());
        // SAFETY: `NonNull<T>` is a transparent thin pointer, and a cell of a `NonNull` variant
        // only ever holds addresses produced by `to_address` above.
        unsafe { reinterpret(address) }
    }

    fn view_mut(address: &mut Address) -> &mut Self {
        debug_assert!(!address.is_null());
        // SAFETY: as above.
        unsafe { reinterpret_mut(address) }
    }
}

// Addresses, never pointees.
macro_rules! storable_pointers {
    ($($ptr:ty),* $(,)?) => {$(
        impl<T: 'static> Storable for $ptr {
            type Storage = PointerOps;

            fn equals(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self == other)
            }

            fn less(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self < other)
            }
        }
    )*};
}

storable_pointers!(*const T, *mut T, NonNull<T>);
