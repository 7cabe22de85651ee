use std::any::Any;
use std::mem::size_of;

use crate::error::{Comparison, VariantError};
use crate::ops::{HeapOps, InlineOps, NullOps, StorageOps};
use crate::pointer::Address;

/// Size of the storage cell's payload: anything scalar and at most this big is held inline.
pub const CELL_SIZE: usize = size_of::<*const ()>();

/// How values of a type are physically held by a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// The empty value.
    Null,
    /// Bit pattern kept directly in the cell. No allocation, no ownership.
    InlineScalar,
    /// A raw pointer kept in the cell. The pointee is never freed.
    NonOwnedPointer,
    /// A separately allocated value owned by the variant.
    OwnedHeap,
}

/// The type properties storage classification looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeShape {
    pub is_null: bool,
    pub is_pointer: bool,
    pub is_scalar: bool,
    pub size: usize,
}

impl TypeShape {
    pub const NULL: Self = Self {
        is_null: true,
        is_pointer: false,
        is_scalar: false,
        size: 0,
    };

    pub const fn scalar<T>() -> Self {
        Self {
            is_null: false,
            is_pointer: false,
            is_scalar: true,
            size: size_of::<T>(),
        }
    }

    pub const fn pointer<T>() -> Self {
        Self {
            is_null: false,
            is_pointer: true,
            is_scalar: false,
            size: size_of::<T>(),
        }
    }

    pub const fn compound<T>() -> Self {
        Self {
            is_null: false,
            is_pointer: false,
            is_scalar: false,
            size: size_of::<T>(),
        }
    }
}

impl StorageMode {
    /// Picks the one storage mode for a type shape.
    ///
    /// Pointers win over scalars, so a pointer's identity is never copied through the inline
    /// path, and a scalar exactly as big as the cell is still inline.
    pub const fn classify(shape: TypeShape) -> StorageMode {
        if shape.is_null {
            StorageMode::Null
        } else if shape.is_pointer {
            StorageMode::NonOwnedPointer
        } else if shape.is_scalar && shape.size <= CELL_SIZE {
            StorageMode::InlineScalar
        } else {
            StorageMode::OwnedHeap
        }
    }

    /// The storage mode selected for `T`.
    pub fn of<T: Storable>() -> StorageMode {
        <T::Storage as StorageOps<T>>::MODE
    }

    pub const fn is_null(self) -> bool {
        matches!(self, StorageMode::Null)
    }

    pub const fn is_inline_scalar(self) -> bool {
        matches!(self, StorageMode::InlineScalar)
    }

    pub const fn is_non_owned_pointer(self) -> bool {
        matches!(self, StorageMode::NonOwnedPointer)
    }

    pub const fn is_owned_heap(self) -> bool {
        matches!(self, StorageMode::OwnedHeap)
    }
}

/// A type a variant can hold.
///
/// `Storage` names the operation family for the type's storage mode. The comparison hooks are
/// only consulted for heap-owned values; inline scalars compare as values and pointers compare
/// by address. Leaving a hook out makes the comparison fail with
/// [`VariantError::MissingComparison`] instead of guessing.
///
/// Most types are better served by the [`storable!`](crate::storable) macro.
pub trait Storable: Any + Clone {
    type Storage: StorageOps<Self>;

    fn equals(&self, _other: &Self) -> Result<bool, VariantError> {
        Err(VariantError::missing_comparison::<Self>(Comparison::Equality))
    }

    fn less(&self, _other: &Self) -> Result<bool, VariantError> {
        Err(VariantError::missing_comparison::<Self>(Comparison::Ordering))
    }
}

/// Makes types storable as owned heap values.
///
/// - `storable!(A, B)` uses `==` and `<` for comparisons.
/// - `storable!(@eq A)` only supports equality.
/// - `storable!(@opaque A)` supports neither.
#[macro_export]
macro_rules! storable {
    (@eq $($ty:ty),+ $(,)?) => {$(
        impl $crate::Storable for $ty {
            type Storage = $crate::HeapOps;

            fn equals(&self, other: &Self) -> ::std::result::Result<bool, $crate::VariantError> {
                Ok(self == other)
            }
        }
    )+};
    (@opaque $($ty:ty),+ $(,)?) => {$(
        impl $crate::Storable for $ty {
            type Storage = $crate::HeapOps;
        }
    )+};
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::Storable for $ty {
            type Storage = $crate::HeapOps;

            fn equals(&self, other: &Self) -> ::std::result::Result<bool, $crate::VariantError> {
                Ok(self == other)
            }

            fn less(&self, other: &Self) -> ::std::result::Result<bool, $crate::VariantError> {
                Ok(self < other)
            }
        }
    )+};
}

/// The absent value. A default-constructed variant holds it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Null;

static_assertions::const_assert!(StorageMode::classify(TypeShape::NULL).is_null());

impl Storable for Null {
    type Storage = NullOps;

    fn equals(&self, _other: &Self) -> Result<bool, VariantError> {
        Ok(true)
    }

    fn less(&self, _other: &Self) -> Result<bool, VariantError> {
        Ok(false)
    }
}

/// Inline payload of a cell.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Scalar {
    Bool(bool),
    Char(char),
    I8(i8),
    I16(i16),
    I32(i32),
    Isize(isize),
    U8(u8),
    U16(u16),
    U32(u32),
    Usize(usize),
    F32(f32),
    #[cfg(target_pointer_width = "64")]
    I64(i64),
    #[cfg(target_pointer_width = "64")]
    U64(u64),
    #[cfg(target_pointer_width = "64")]
    F64(f64),
}

mod sealed {
    pub trait Sealed {}
}

/// Scalars that fit the cell. Implemented for the primitive types only.
pub trait ScalarRepr: Copy + PartialEq + PartialOrd + sealed::Sealed + 'static {
    fn into_scalar(self) -> Scalar;
    fn from_scalar(scalar: &Scalar) -> Option<&Self>;
    fn from_scalar_mut(scalar: &mut Scalar) -> Option<&mut Self>;
}

macro_rules! inline_scalars {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        static_assertions::const_assert!(StorageMode::classify(TypeShape::scalar::<$ty>()).is_inline_scalar());

        impl sealed::Sealed for $ty {}

        impl ScalarRepr for $ty {
            #[inline(always)]
            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }

            #[inline(always)]
            fn from_scalar(scalar: &Scalar) -> Option<&Self> {
                match scalar {
                    Scalar::$variant(value) => Some(value),
                    _ => None,
                }
            }

            #[inline(always)]
            fn from_scalar_mut(scalar: &mut Scalar) -> Option<&mut Self> {
                match scalar {
                    Scalar::$variant(value) => Some(value),
                    _ => None,
                }
            }
        }

        impl Storable for $ty {
            type Storage = InlineOps;

            fn equals(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self == other)
            }

            fn less(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self < other)
            }
        }
    )*};
}

// Scalars too large for the cell. Still comparable as values.
macro_rules! heap_scalars {
    ($($ty:ty),* $(,)?) => {$(
        static_assertions::const_assert!(StorageMode::classify(TypeShape::scalar::<$ty>()).is_owned_heap());

        impl Storable for $ty {
            type Storage = HeapOps;

            fn equals(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self == other)
            }

            fn less(&self, other: &Self) -> Result<bool, VariantError> {
                Ok(self < other)
            }
        }
    )*};
}

inline_scalars!(
    bool => Bool,
    char => Char,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    usize => Usize,
    f32 => F32,
);

#[cfg(target_pointer_width = "64")]
inline_scalars!(i64 => I64, u64 => U64, f64 => F64);

#[cfg(not(target_pointer_width = "64"))]
heap_scalars!(i64, u64, f64);

heap_scalars!(i128, u128);

static_assertions::const_assert!(StorageMode::classify(TypeShape::compound::<String>()).is_owned_heap());

storable!(String);

/// The single storage slot of a variant.
///
/// Its content is only meaningful through the dispatch table held next to it.
#[derive(Debug, Default)]
pub enum Cell {
    #[default]
    Empty,
    Inline(Scalar),
    Pointer(Address),
    Owned(Box<dyn Any>),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_sized_scalar_stays_inline() {
        let shape = TypeShape::scalar::<usize>();
        assert_eq!(shape.size, CELL_SIZE);
        assert_eq!(StorageMode::classify(shape), StorageMode::InlineScalar);
    }

    #[test]
    fn pointer_beats_scalar() {
        let shape = TypeShape {
            is_null: false,
            is_pointer: true,
            is_scalar: true,
            size: CELL_SIZE,
        };
        assert_eq!(StorageMode::classify(shape), StorageMode::NonOwnedPointer);
    }

    #[test]
    fn oversized_scalar_goes_to_heap() {
        assert_eq!(StorageMode::classify(TypeShape::scalar::<u128>()), StorageMode::OwnedHeap);
    }
}
