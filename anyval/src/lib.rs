//! A value container that can hold any type chosen at runtime.
//!
//! Each stored type gets one storage mode (inline scalar, non-owned pointer, owned heap value,
//! or null) and one dispatch table of operations for it. Reading a type other than the stored
//! one goes through the caster registry of the variant's policy.

/// How values are physically held: storage modes, their classifier and the storage cell.
pub mod storage;
/// Raw pointers held without ownership.
pub mod pointer;
/// One operation family per storage mode.
pub mod ops;
/// Per-type tables of operations, built once.
pub mod dispatch;
/// Conversion codes, casters, policies and their registries.
pub mod policy;
/// Conversions between the scalar palette and strings.
pub mod convert;
/// The variant itself.
pub mod variant;
pub mod error;
mod containers;

#[cfg(feature = "bignum")]
pub mod bignum;

pub use dispatch::{dispatch_table, DispatchTable};
pub use error::{CastError, Comparison, VariantError};
pub use ops::{HeapOps, InlineOps, NullOps, PointerOps, StorageOps};
pub use policy::{codes, CastPolicy, Caster, CasterRegistry, DefaultPolicy, TypeCode};
pub use storage::{Cell, Null, Storable, StorageMode, TypeShape};
pub use variant::{BasicVariant, Variant};

#[cfg(feature = "bignum")]
pub use bignum::{BigNumPolicy, BigNumVariant};
