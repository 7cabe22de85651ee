use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{debug, trace, warn};
use once_cell::sync::Lazy;

use crate::error::{CastError, VariantError};
use crate::storage::{Cell, Null, Storable};

/// Small integer identifying a type to the casters of a policy.
pub type TypeCode = i32;

/// Conversion codes of the default policy.
pub mod codes {
    use super::TypeCode;

    pub const NULL: TypeCode = -1;
    /// Types without a registered code.
    pub const DEFAULT: TypeCode = 0;
    pub const BOOL: TypeCode = 1;
    pub const F32: TypeCode = 2;
    pub const F64: TypeCode = 3;
    pub const STRING: TypeCode = 4;
    pub const I8: TypeCode = 5;
    pub const I16: TypeCode = 6;
    pub const I32: TypeCode = 7;
    pub const I64: TypeCode = 8;
    pub const ISIZE: TypeCode = 9;
    pub const U8: TypeCode = 10;
    pub const U16: TypeCode = 11;
    pub const U32: TypeCode = 12;
    pub const U64: TypeCode = 13;
    pub const USIZE: TypeCode = 14;
    /// Reserved for the property object collaborator.
    pub const OBJECT: TypeCode = 15;
    /// Reserved for the variant array collaborator.
    pub const ARRAY: TypeCode = 16;
    /// First code free for extension policies.
    pub const FIRST_EXTENSION: TypeCode = 17;
}

/// Conversions of one value type under policy `P`.
///
/// `cell` always belongs to a variant whose stored type has the given conversion code.
pub trait Caster<P: CastPolicy>: Storable {
    /// Produces a value of this type from a cell holding a value of code `src_code`.
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError>;

    /// Writes `value` into a cell holding a value of code `dest_code`, keeping that type.
    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError>;
}

/// Tag type selecting the caster registry a family of variants consults.
pub trait CastPolicy: Sized + 'static {
    fn registry() -> &'static CasterRegistry;
}

type CastToFn = fn(&Cell, TypeCode, &mut dyn Any) -> Result<(), CastError>;
type CastFromFn = fn(&mut Cell, TypeCode, &dyn Any) -> Result<(), CastError>;

/// Type-erased casters of one value type.
#[derive(Clone, Copy)]
pub struct CasterEntry {
    cast_to: CastToFn,
    cast_from: CastFromFn,
}

impl CasterEntry {
    pub fn of<T: Caster<P>, P: CastPolicy>() -> Self {
        Self {
            cast_to: cast_to_erased::<T, P>,
            cast_from: cast_from_erased::<T, P>,
        }
    }
}

fn cast_to_erased<T: Caster<P>, P: CastPolicy>(cell: &Cell, src_code: TypeCode, out: &mut dyn Any) -> Result<(), CastError> {
    let out = out.downcast_mut::<Option<T>>().ok_or(CastError::Unsupported)?;
    *out = Some(T::cast_to_value(cell, src_code)?);
    Ok(())
}

fn cast_from_erased<T: Caster<P>, P: CastPolicy>(cell: &mut Cell, dest_code: TypeCode, value: &dyn Any) -> Result<(), CastError> {
    let value = value.downcast_ref::<T>().ok_or(CastError::Unsupported)?;
    T::cast_from_value(cell, dest_code, value)
}

#[derive(Default)]
struct Entries {
    codes: HashMap<TypeId, TypeCode>,
    owners: HashMap<TypeCode, &'static str>,
    casters: HashMap<TypeId, CasterEntry>,
}

/// Conversion codes and casters of a policy.
///
/// A registry may extend a base registry: codes and casters it does not define itself are
/// looked up in the base, so an extension only lists what it adds or overrides.
///
/// Registration is meant to happen before the registered type is first stored in a variant:
/// dispatch tables read the conversion code once, when they are built.
pub struct CasterRegistry {
    name: &'static str,
    base: Option<&'static CasterRegistry>,
    entries: RwLock<Entries>,
}

impl CasterRegistry {
    pub fn new(name: &'static str) -> Self {
        debug!("building caster registry `{}`", name);
        Self {
            name,
            base: None,
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn extending(name: &'static str, base: &'static CasterRegistry) -> Self {
        debug!("building caster registry `{}` on top of `{}`", name, base.name);
        Self {
            name,
            base: Some(base),
            entries: RwLock::new(Entries::default()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base(&self) -> Option<&'static CasterRegistry> {
        self.base
    }

    pub fn with_type_code<T: 'static>(self, code: TypeCode) -> Self {
        if let Err(err) = self.register_type_code::<T>(code) {
            warn!("registry `{}`: {}", self.name, err);
        }
        self
    }

    pub fn with_caster<T: Caster<P>, P: CastPolicy>(self) -> Self {
        self.register_caster::<T, P>();
        self
    }

    fn read(&self) -> RwLockReadGuard<'_, Entries> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Entries> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assigns a conversion code to `T`.
    ///
    /// Registering the same pair twice is a no-op. A code owned by another type, here or in a
    /// base registry, is refused.
    pub fn register_type_code<T: 'static>(&self, code: TypeCode) -> Result<(), VariantError> {
        let owner = type_name::<T>();
        if let Some(existing) = self.owner_of(code) {
            return if existing == owner && self.type_code::<T>() == code {
                Ok(())
            } else {
                Err(VariantError::CodeTaken { code, owner: existing })
            };
        }

        let mut entries = self.write();
        if let Some(previous) = entries.codes.insert(TypeId::of::<T>(), code) {
            entries.owners.remove(&previous);
        }
        entries.owners.insert(code, owner);
        debug!("registry `{}`: {} has conversion code {}", self.name, owner, code);
        Ok(())
    }

    pub fn register_caster<T: Caster<P>, P: CastPolicy>(&self) {
        self.write().casters.insert(TypeId::of::<T>(), CasterEntry::of::<T, P>());
    }

    fn owner_of(&self, code: TypeCode) -> Option<&'static str> {
        let own = self.read().owners.get(&code).copied();
        own.or_else(|| self.base.and_then(|base| base.owner_of(code)))
    }

    /// The conversion code of `T`, or [`codes::DEFAULT`] when it has none.
    pub fn type_code<T: 'static>(&self) -> TypeCode {
        self.type_code_of(TypeId::of::<T>())
    }

    pub fn type_code_of(&self, type_id: TypeId) -> TypeCode {
        let own = self.read().codes.get(&type_id).copied();
        own.or_else(|| self.base.map(|base| base.type_code_of(type_id)))
            .unwrap_or(codes::DEFAULT)
    }

    pub fn caster_of(&self, type_id: TypeId) -> Option<CasterEntry> {
        let own = self.read().casters.get(&type_id).copied();
        own.or_else(|| self.base.and_then(|base| base.caster_of(type_id)))
    }

    pub fn has_caster<T: 'static>(&self) -> bool {
        self.caster_of(TypeId::of::<T>()).is_some()
    }

    /// Converts whatever `cell` holds (tagged by `src_code`) into a `T`.
    pub fn cast_to_value<T: 'static>(&self, cell: &Cell, src_code: TypeCode) -> Result<T, CastError> {
        let entry = self.caster_of(TypeId::of::<T>()).ok_or(CastError::Unsupported)?;
        let mut out = None::<T>;
        (entry.cast_to)(cell, src_code, &mut out).inspect_err(|err| {
            trace!("registry `{}`: code {} to {} failed: {}", self.name, src_code, type_name::<T>(), err)
        })?;
        out.ok_or(CastError::Unsupported)
    }

    /// Writes `value` into `cell`, whose stored type has code `dest_code`.
    pub fn cast_from_value<T: 'static>(&self, cell: &mut Cell, dest_code: TypeCode, value: &T) -> Result<(), CastError> {
        let entry = self.caster_of(TypeId::of::<T>()).ok_or(CastError::Unsupported)?;
        (entry.cast_from)(cell, dest_code, value).inspect_err(|err| {
            trace!("registry `{}`: {} to code {} failed: {}", self.name, type_name::<T>(), dest_code, err)
        })
    }
}

/// The policy of plain [`Variant`](crate::Variant)s: the scalar palette and strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicy;

macro_rules! palette {
    ($registry:expr; $($ty:ty => $code:expr),* $(,)?) => {
        $registry
            $(.with_type_code::<$ty>($code).with_caster::<$ty, DefaultPolicy>())*
    };
}

static DEFAULT_REGISTRY: Lazy<CasterRegistry> = Lazy::new(|| {
    palette!(CasterRegistry::new("default").with_type_code::<Null>(codes::NULL);
        bool => codes::BOOL,
        f32 => codes::F32,
        f64 => codes::F64,
        String => codes::STRING,
        i8 => codes::I8,
        i16 => codes::I16,
        i32 => codes::I32,
        i64 => codes::I64,
        isize => codes::ISIZE,
        u8 => codes::U8,
        u16 => codes::U16,
        u32 => codes::U32,
        u64 => codes::U64,
        usize => codes::USIZE,
    )
});

impl CastPolicy for DefaultPolicy {
    fn registry() -> &'static CasterRegistry {
        &DEFAULT_REGISTRY
    }
}
