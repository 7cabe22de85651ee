use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use log::debug;
use once_cell::sync::Lazy;

use crate::error::VariantError;
use crate::ops::{OpsOf, StorageOps};
use crate::policy::{CastPolicy, TypeCode};
use crate::storage::{Cell, Storable, StorageMode};

/// The operations and identity of one stored type under one policy.
///
/// Built once per `(type, policy)` pair and never freed: every variant holding that type
/// points at the same table.
pub struct DispatchTable {
    type_id: TypeId,
    type_name: &'static str,
    type_code: TypeCode,
    mode: StorageMode,

    pub(crate) destroy: Option<fn(&mut Cell)>,
    pub(crate) copy: Option<fn(&mut Cell, &Cell)>,
    /// Takes the value out of an `Option<T>`.
    pub(crate) assign: fn(&mut Cell, &mut dyn Any) -> bool,
    pub(crate) hold: fn(&mut Cell, Box<dyn Any>) -> bool,
    pub(crate) init_from: fn(&Cell) -> Cell,
    pub(crate) value_ptr: Option<fn(&mut Cell) -> Option<&mut dyn Any>>,
    pub(crate) value_ref: Option<fn(&Cell) -> Option<&dyn Any>>,
    /// Clones the value into an `Option<T>`.
    pub(crate) read_value: Option<fn(&Cell, &mut dyn Any) -> bool>,
    pub(crate) equals: fn(&Cell, &Cell) -> Result<bool, VariantError>,
    pub(crate) less: fn(&Cell, &Cell) -> Result<bool, VariantError>,
}

impl DispatchTable {
    fn build<T: Storable, P: CastPolicy>() -> Self {
        let addressable = <OpsOf<T> as StorageOps<T>>::SUPPORTS_ADDRESS;

        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            type_code: P::registry().type_code::<T>(),
            mode: <OpsOf<T> as StorageOps<T>>::MODE,
            destroy: <OpsOf<T> as StorageOps<T>>::NEEDS_DELETER
                .then_some(<OpsOf<T> as StorageOps<T>>::destroy as fn(&mut Cell)),
            copy: <OpsOf<T> as StorageOps<T>>::SUPPORTS_COPY
                .then_some(<OpsOf<T> as StorageOps<T>>::copy as fn(&mut Cell, &Cell)),
            assign: assign::<T>,
            hold: hold::<T>,
            init_from: <OpsOf<T> as StorageOps<T>>::init_from,
            value_ptr: addressable.then_some(value_ptr::<T> as fn(&mut Cell) -> Option<&mut dyn Any>),
            value_ref: addressable.then_some(value_ref::<T> as fn(&Cell) -> Option<&dyn Any>),
            read_value: addressable.then_some(read_value::<T> as fn(&Cell, &mut dyn Any) -> bool),
            equals: <OpsOf<T> as StorageOps<T>>::equals,
            less: <OpsOf<T> as StorageOps<T>>::less,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_code(&self) -> TypeCode {
        self.type_code
    }

    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    pub fn needs_deleter(&self) -> bool {
        self.destroy.is_some()
    }

    pub fn supports_copy(&self) -> bool {
        self.copy.is_some()
    }

    pub fn supports_address(&self) -> bool {
        self.value_ptr.is_some()
    }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("type_name", &self.type_name)
            .field("type_code", &self.type_code)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn assign<T: Storable>(cell: &mut Cell, value: &mut dyn Any) -> bool {
    match value.downcast_mut::<Option<T>>().and_then(Option::take) {
        Some(value) => {
            <OpsOf<T> as StorageOps<T>>::assign(cell, value);
            true
        }
        None => false,
    }
}

fn hold<T: Storable>(cell: &mut Cell, value: Box<dyn Any>) -> bool {
    match value.downcast::<T>() {
        Ok(value) => {
            <OpsOf<T> as StorageOps<T>>::hold(cell, value);
            true
        }
        Err(_) => false,
    }
}

fn value_ptr<T: Storable>(cell: &mut Cell) -> Option<&mut dyn Any> {
    <OpsOf<T> as StorageOps<T>>::value_mut(cell).map(|value| value as &mut dyn Any)
}

fn value_ref<T: Storable>(cell: &Cell) -> Option<&dyn Any> {
    <OpsOf<T> as StorageOps<T>>::value_ref(cell).map(|value| value as &dyn Any)
}

fn read_value<T: Storable>(cell: &Cell, out: &mut dyn Any) -> bool {
    match (<OpsOf<T> as StorageOps<T>>::value_ref(cell), out.downcast_mut::<Option<T>>()) {
        (Some(value), Some(out)) => {
            *out = Some(value.clone());
            true
        }
        _ => false,
    }
}

static TABLES: Lazy<RwLock<HashMap<(TypeId, TypeId), &'static DispatchTable>>> = Lazy::new(Default::default);

/// The dispatch table of `T` under policy `P`, built on first request.
///
/// Every call for the same pair returns the same table.
pub fn dispatch_table<T: Storable, P: CastPolicy>() -> &'static DispatchTable {
    let key = (TypeId::of::<T>(), TypeId::of::<P>());

    let cached = TABLES.read().unwrap_or_else(PoisonError::into_inner).get(&key).copied();
    if let Some(table) = cached {
        return table;
    }

    let mut tables = TABLES.write().unwrap_or_else(PoisonError::into_inner);
    *tables.entry(key).or_insert_with(|| {
        let table: &'static DispatchTable = Box::leak(Box::new(DispatchTable::build::<T, P>()));
        debug!(
            "dispatch table for {} ({:?}, code {}) under {}",
            table.type_name,
            table.mode,
            table.type_code,
            type_name::<P>()
        );
        table
    })
}
