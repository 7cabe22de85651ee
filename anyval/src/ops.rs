use std::any::Any;

use crate::error::VariantError;
use crate::pointer::PointerRepr;
use crate::storage::{Cell, ScalarRepr, Storable, StorageMode};

/// The operation family of a type's storage mode.
pub(crate) type OpsOf<T> = <T as Storable>::Storage;

/// Operations on a cell holding a `T`, one implementation per storage mode.
///
/// Every function assumes the cell was written by the same family for the same `T`. A cell in
/// any other state reads as absent and compares as unequal.
pub trait StorageOps<T>: 'static {
    const MODE: StorageMode;
    /// Whether clearing the cell frees something.
    const NEEDS_DELETER: bool = false;
    /// Whether a value can be copied into an existing cell without reallocating.
    const SUPPORTS_COPY: bool = false;
    /// Whether the stored value can be addressed.
    const SUPPORTS_ADDRESS: bool = true;

    fn destroy(cell: &mut Cell) {
        *cell = Cell::Empty;
    }

    /// Copies `src` over `dest` in place. Only called when `SUPPORTS_COPY` holds.
    fn copy(_dest: &mut Cell, _src: &Cell) {}

    fn assign(cell: &mut Cell, value: T);

    /// Takes ownership of an already allocated value.
    fn hold(cell: &mut Cell, value: Box<T>);

    fn init_from(src: &Cell) -> Cell;

    fn value_ref(cell: &Cell) -> Option<&T>;

    fn value_mut(cell: &mut Cell) -> Option<&mut T>;

    fn equals(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError>;

    fn less(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError>;
}

/// Operations for the null value: nothing to hold, nothing to address.
pub struct NullOps;

/// Operations for scalars held inline.
pub struct InlineOps;

/// Operations for raw pointers held without ownership.
pub struct PointerOps;

/// Operations for values owned on the heap.
pub struct HeapOps;

impl<T: 'static> StorageOps<T> for NullOps {
    const MODE: StorageMode = StorageMode::Null;
    const SUPPORTS_ADDRESS: bool = false;

    fn assign(cell: &mut Cell, _value: T) {
        *cell = Cell::Empty;
    }

    fn hold(cell: &mut Cell, _value: Box<T>) {
        *cell = Cell::Empty;
    }

    fn init_from(_src: &Cell) -> Cell {
        Cell::Empty
    }

    fn value_ref(_cell: &Cell) -> Option<&T> {
        None
    }

    fn value_mut(_cell: &mut Cell) -> Option<&mut T> {
        None
    }

    fn equals(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        Ok(lhs.is_empty() && rhs.is_empty())
    }

    fn less(_lhs: &Cell, _rhs: &Cell) -> Result<bool, VariantError> {
        Ok(false)
    }
}

fn inline_ref<T: ScalarRepr>(cell: &Cell) -> Option<&T> {
    match cell {
        Cell::Inline(scalar) => T::from_scalar(scalar),
        _ => None,
    }
}

impl<T: ScalarRepr> StorageOps<T> for InlineOps {
    const MODE: StorageMode = StorageMode::InlineScalar;

    fn assign(cell: &mut Cell, value: T) {
        *cell = Cell::Inline(value.into_scalar());
    }

    fn hold(cell: &mut Cell, value: Box<T>) {
        *cell = Cell::Inline((*value).into_scalar());
    }

    fn init_from(src: &Cell) -> Cell {
        match src {
            Cell::Inline(scalar) => Cell::Inline(*scalar),
            _ => Cell::Empty,
        }
    }

    fn value_ref(cell: &Cell) -> Option<&T> {
        inline_ref(cell)
    }

    fn value_mut(cell: &mut Cell) -> Option<&mut T> {
        match cell {
            Cell::Inline(scalar) => T::from_scalar_mut(scalar),
            _ => None,
        }
    }

    fn equals(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (inline_ref::<T>(lhs), inline_ref::<T>(rhs)) {
            (Some(lhs), Some(rhs)) => Ok(lhs == rhs),
            _ => Ok(false),
        }
    }

    fn less(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (inline_ref::<T>(lhs), inline_ref::<T>(rhs)) {
            (Some(lhs), Some(rhs)) => Ok(lhs < rhs),
            _ => Ok(false),
        }
    }
}

impl<T: PointerRepr> StorageOps<T> for PointerOps {
    const MODE: StorageMode = StorageMode::NonOwnedPointer;

    fn assign(cell: &mut Cell, value: T) {
        *cell = Cell::Pointer(value.to_address());
    }

    fn hold(cell: &mut Cell, value: Box<T>) {
        *cell = Cell::Pointer((*value).to_address());
    }

    fn init_from(src: &Cell) -> Cell {
        match src {
            Cell::Pointer(address) => Cell::Pointer(*address),
            _ => Cell::Empty,
        }
    }

    fn value_ref(cell: &Cell) -> Option<&T> {
        match cell {
            Cell::Pointer(address) => Some(T::view(address)),
            _ => None,
        }
    }

    fn value_mut(cell: &mut Cell) -> Option<&mut T> {
        match cell {
            Cell::Pointer(address) => Some(T::view_mut(address)),
            _ => None,
        }
    }

    // Addresses, never pointees.
    fn equals(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (lhs, rhs) {
            (Cell::Pointer(lhs), Cell::Pointer(rhs)) => Ok(lhs == rhs),
            _ => Ok(false),
        }
    }

    fn less(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (lhs, rhs) {
            (Cell::Pointer(lhs), Cell::Pointer(rhs)) => Ok(lhs < rhs),
            _ => Ok(false),
        }
    }
}

fn heap_ref<T: Any>(cell: &Cell) -> Option<&T> {
    match cell {
        Cell::Owned(value) => value.downcast_ref(),
        _ => None,
    }
}

fn heap_mut<T: Any>(cell: &mut Cell) -> Option<&mut T> {
    match cell {
        Cell::Owned(value) => value.downcast_mut(),
        _ => None,
    }
}

impl<T: Storable> StorageOps<T> for HeapOps {
    const MODE: StorageMode = StorageMode::OwnedHeap;
    const NEEDS_DELETER: bool = true;
    const SUPPORTS_COPY: bool = true;

    fn destroy(cell: &mut Cell) {
        drop(std::mem::take(cell));
    }

    fn copy(dest: &mut Cell, src: &Cell) {
        if let (Some(dest), Some(src)) = (heap_mut::<T>(dest), heap_ref::<T>(src)) {
            dest.clone_from(src);
        }
    }

    fn assign(cell: &mut Cell, value: T) {
        match heap_mut::<T>(cell) {
            Some(existing) => *existing = value,
            None => *cell = Cell::Owned(Box::new(value)),
        }
    }

    fn hold(cell: &mut Cell, value: Box<T>) {
        *cell = Cell::Owned(value);
    }

    fn init_from(src: &Cell) -> Cell {
        heap_ref::<T>(src).map_or(Cell::Empty, |value| Cell::Owned(Box::new(value.clone())))
    }

    fn value_ref(cell: &Cell) -> Option<&T> {
        heap_ref(cell)
    }

    fn value_mut(cell: &mut Cell) -> Option<&mut T> {
        heap_mut(cell)
    }

    fn equals(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (heap_ref::<T>(lhs), heap_ref::<T>(rhs)) {
            (Some(lhs), Some(rhs)) => lhs.equals(rhs),
            _ => Ok(false),
        }
    }

    fn less(lhs: &Cell, rhs: &Cell) -> Result<bool, VariantError> {
        match (heap_ref::<T>(lhs), heap_ref::<T>(rhs)) {
            (Some(lhs), Some(rhs)) => lhs.less(rhs),
            _ => Ok(false),
        }
    }
}
