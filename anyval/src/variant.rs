use std::any::{type_name, Any, TypeId};
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

use crate::dispatch::{dispatch_table, DispatchTable};
use crate::error::VariantError;
use crate::policy::{CastPolicy, DefaultPolicy, TypeCode};
use crate::ops::HeapOps;
use crate::storage::{Cell, Null, Storable, StorageMode};

/// A value of any storable type, chosen at runtime.
///
/// Holds one dispatch table and one cell. The cell is only ever read through the table it was
/// written with, and both always change together.
///
/// `P` selects the caster registry used when the requested type is not the stored one.
pub struct BasicVariant<P: CastPolicy = DefaultPolicy> {
    table: &'static DispatchTable,
    cell: Cell,
    policy: PhantomData<fn() -> P>,
}

/// A variant using the default conversion policy.
pub type Variant = BasicVariant<DefaultPolicy>;

impl<P: CastPolicy> BasicVariant<P> {
    /// A null variant.
    pub fn new() -> Self {
        Self {
            table: dispatch_table::<Null, P>(),
            cell: Cell::Empty,
            policy: PhantomData,
        }
    }

    /// A variant holding exactly `value`.
    pub fn value_of<T: Storable>(value: T) -> Self {
        let mut variant = Self {
            table: dispatch_table::<T, P>(),
            cell: Cell::Empty,
            policy: PhantomData,
        };
        variant.assign(value);
        variant
    }

    /// Text is stored as a `String`, not as a borrowed pointer.
    pub fn value_of_str(value: &str) -> Self {
        Self::value_of(value.to_owned())
    }

    /// A variant of type `D` built from a value of another type through the casters.
    pub fn value_of_as<D, T>(value: T) -> Result<Self, VariantError>
    where
        D: Storable + Default,
        T: Storable,
    {
        let mut variant = Self::value_of(D::default());
        variant.set_value(value)?;
        Ok(variant)
    }

    fn assign<T: Storable>(&mut self, value: T) {
        let assigned = (self.table.assign)(&mut self.cell, &mut Some(value));
        debug_assert!(assigned, "dispatch table of {} cannot take a {}", self.table.type_name(), type_name::<T>());
    }

    fn destroy(&mut self) {
        if let Some(destroy) = self.table.destroy {
            destroy(&mut self.cell);
        }
        self.cell = Cell::Empty;
    }

    fn rebind<T: Storable>(&mut self) {
        self.destroy();
        self.table = dispatch_table::<T, P>();
    }

    /// Replaces the content with `value`, changing the stored type to `T`.
    pub fn set_as<T: Storable>(&mut self, value: T) {
        if !self.is::<T>() {
            self.rebind::<T>();
        }
        self.assign(value);
    }

    /// Writes `value` into the currently stored type, converting it.
    ///
    /// A null variant accepts any value and stays null.
    pub fn set_value<T: Storable>(&mut self, value: T) -> Result<(), VariantError> {
        if self.is::<T>() {
            self.assign(value);
            return Ok(());
        }
        P::registry()
            .cast_from_value(&mut self.cell, self.table.type_code(), &value)
            .map_err(|cause| VariantError::conversion_from::<T>(self.table, cause))
    }

    fn read_direct<T: Storable>(&self) -> Option<T> {
        let read = self.table.read_value.filter(|_| self.is::<T>())?;
        let mut out = None::<T>;
        read(&self.cell, &mut out);
        out
    }

    /// The stored value as a `T`, read directly when the types match and converted otherwise.
    pub fn get_as<T: Storable>(&self) -> Result<T, VariantError> {
        if let Some(value) = self.read_direct::<T>() {
            return Ok(value);
        }
        P::registry()
            .cast_to_value::<T>(&self.cell, self.table.type_code())
            .map_err(|cause| VariantError::conversion_to::<T>(self.table, cause))
    }

    /// Same as [`get_as`](Self::get_as), writing into `out`. `out` is left alone on failure.
    pub fn get_into<T: Storable>(&self, out: &mut T) -> Result<(), VariantError> {
        *out = self.get_as()?;
        Ok(())
    }

    pub fn get_as_def<T: Storable>(&self, default: T) -> T {
        self.get_as().unwrap_or(default)
    }

    /// Whether [`get_as`](Self::get_as) would succeed for the value held right now.
    pub fn is_convertible_to<T: Storable>(&self) -> bool {
        (self.is::<T>() && self.table.read_value.is_some())
            || P::registry().cast_to_value::<T>(&self.cell, self.table.type_code()).is_ok()
    }

    /// The stored value, for in-place mutation. Never converts.
    pub fn get_ptr<T: Storable>(&mut self) -> Option<&mut T> {
        if !self.is::<T>() {
            return None;
        }
        let value_ptr = self.table.value_ptr?;
        value_ptr(&mut self.cell)?.downcast_mut::<T>()
    }

    pub fn get_ref<T: Storable>(&self) -> Result<&T, VariantError> {
        self.value_any()
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(|| VariantError::type_mismatch::<T>(self.table))
    }

    pub fn get_mut<T: Storable>(&mut self) -> Result<&mut T, VariantError> {
        let table = self.table;
        self.get_ptr::<T>().ok_or_else(|| VariantError::type_mismatch::<T>(table))
    }

    pub fn get_ref_def<'a, T: Storable>(&'a self, default: &'a T) -> &'a T {
        self.get_ref().unwrap_or(default)
    }

    /// The stored value, type-erased. `None` for null.
    pub fn value_any(&self) -> Option<&dyn Any> {
        let value_ref = self.table.value_ref?;
        value_ref(&self.cell)
    }

    pub fn value_any_mut(&mut self) -> Option<&mut dyn Any> {
        let value_ptr = self.table.value_ptr?;
        value_ptr(&mut self.cell)
    }

    /// Takes ownership of a boxed value, dropping the previous content.
    pub fn hold<T: Storable>(&mut self, value: Box<T>) {
        self.rebind::<T>();
        let held = (self.table.hold)(&mut self.cell, value);
        debug_assert!(held, "dispatch table of {} cannot hold a {}", self.table.type_name(), type_name::<T>());
    }

    /// Hands the owned value back to the caller and leaves the variant null.
    ///
    /// Only heap-owned values of type `T` are released; anything else returns `None` and leaves
    /// the variant as it was.
    pub fn release<T: Storable>(&mut self) -> Option<Box<T>> {
        if !self.table.needs_deleter() || !self.is::<T>() {
            return None;
        }
        match std::mem::take(&mut self.cell) {
            Cell::Owned(value) => match value.downcast::<T>() {
                Ok(value) => {
                    self.table = dispatch_table::<Null, P>();
                    Some(value)
                }
                Err(value) => {
                    self.cell = Cell::Owned(value);
                    None
                }
            },
            other => {
                self.cell = other;
                None
            }
        }
    }

    /// Same as [`release`](Self::release), reporting why nothing was released.
    pub fn try_release<T: Storable>(&mut self) -> Result<Box<T>, VariantError> {
        if !self.is::<T>() {
            return Err(VariantError::type_mismatch::<T>(self.table));
        }
        if !self.table.needs_deleter() {
            return Err(VariantError::unsupported("release", self.table));
        }
        let table = self.table;
        self.release().ok_or_else(|| VariantError::type_mismatch::<T>(table))
    }

    /// Back to null.
    pub fn reset(&mut self) {
        self.destroy();
        self.table = dispatch_table::<Null, P>();
    }

    /// Moves the content out, leaving null behind.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.table.type_id() == TypeId::of::<T>()
    }

    pub fn is_null(&self) -> bool {
        self.is::<Null>()
    }

    pub fn type_id(&self) -> TypeId {
        self.table.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.table.type_name()
    }

    /// Conversion code of the stored type, [`codes::DEFAULT`](crate::codes::DEFAULT) if it has none.
    pub fn type_code(&self) -> TypeCode {
        self.table.type_code()
    }

    pub fn storage_mode(&self) -> StorageMode {
        self.table.mode()
    }

    pub fn dispatch_table(&self) -> &'static DispatchTable {
        self.table
    }

    /// Equality, failing when the stored type cannot be compared.
    ///
    /// Different conversion codes or types are simply unequal.
    pub fn try_eq(&self, other: &Self) -> Result<bool, VariantError> {
        if self.type_code() != other.type_code() || self.type_id() != other.type_id() {
            return Ok(false);
        }
        (self.table.equals)(&self.cell, &other.cell)
    }

    /// Strict ordering: by conversion code first, then by value for the same type.
    ///
    /// Different types sharing a code are never less than each other.
    pub fn try_less(&self, other: &Self) -> Result<bool, VariantError> {
        if self.type_code() != other.type_code() {
            return Ok(self.type_code() < other.type_code());
        }
        if self.type_id() != other.type_id() {
            return Ok(false);
        }
        (self.table.less)(&self.cell, &other.cell)
    }
}

impl<P: CastPolicy> Default for BasicVariant<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: CastPolicy> Clone for BasicVariant<P> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            cell: (self.table.init_from)(&self.cell),
            policy: PhantomData,
        }
    }

    fn clone_from(&mut self, source: &Self) {
        if ptr::eq(self.table, source.table) {
            if let Some(copy) = self.table.copy {
                copy(&mut self.cell, &source.cell);
                return;
            }
        }
        self.destroy();
        self.table = source.table;
        self.cell = (source.table.init_from)(&source.cell);
    }
}

impl<P: CastPolicy> Drop for BasicVariant<P> {
    fn drop(&mut self) {
        if let Some(destroy) = self.table.destroy {
            destroy(&mut self.cell);
        }
    }
}

/// # Panics
/// When both sides hold the same heap type and it has no equality.
impl<P: CastPolicy> PartialEq for BasicVariant<P> {
    fn eq(&self, other: &Self) -> bool {
        match self.try_eq(other) {
            Ok(equal) => equal,
            Err(err) => panic!("{err}"),
        }
    }
}

/// # Panics
/// When both sides hold the same heap type and it lacks the comparison needed.
impl<P: CastPolicy> PartialOrd for BasicVariant<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.type_code() != other.type_code() {
            return Some(self.type_code().cmp(&other.type_code()));
        }
        if self.type_id() != other.type_id() {
            return None;
        }

        let less = |lhs: &Self, rhs: &Self| match lhs.try_less(rhs) {
            Ok(less) => less,
            Err(err) => panic!("{err}"),
        };
        if self == other {
            Some(Ordering::Equal)
        } else if less(self, other) {
            Some(Ordering::Less)
        } else if less(other, self) {
            Some(Ordering::Greater)
        } else {
            None
        }
    }
}

/// Variants nest, comparing like the outer one would.
impl<P: CastPolicy> Storable for BasicVariant<P> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        self.try_eq(other)
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        self.try_less(other)
    }
}

impl<P: CastPolicy> fmt::Debug for BasicVariant<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("type_name", &self.type_name())
            .field("type_code", &self.type_code())
            .field("mode", &self.storage_mode())
            .finish_non_exhaustive()
    }
}

impl<P: CastPolicy> From<&str> for BasicVariant<P> {
    fn from(value: &str) -> Self {
        Self::value_of_str(value)
    }
}

macro_rules! from_storable {
    ($($ty:ty),* $(,)?) => {$(
        impl<P: CastPolicy> From<$ty> for BasicVariant<P> {
            fn from(value: $ty) -> Self {
                Self::value_of(value)
            }
        }
    )*};
}

from_storable!(Null, bool, char, f32, f64, String, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, i128, u128);
