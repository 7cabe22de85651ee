use std::any::type_name;
use std::fmt;

use crate::dispatch::DispatchTable;
use crate::policy::TypeCode;
use crate::storage::StorageMode;

/// Why a single caster call could not produce or write a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CastError {
    #[error("no conversion is defined between these types")]
    Unsupported,

    #[error("value is above the range of the target type")]
    Overflow,

    #[error("value is below the range of the target type")]
    Underflow,

    #[error("text is not valid for the target type")]
    Malformed,

    #[error("NaN has no value in the target type")]
    NotANumber,
}

/// The comparison a stored type was asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Equality,
    Ordering,
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparison::Equality => f.write_str("equals"),
            Comparison::Ordering => f.write_str("less operator"),
        }
    }
}

/// Errors raised to callers of the variant API.
///
/// Messages only ever carry type metadata (conversion code and type names), never the
/// value held by the variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VariantError {
    #[error("conversion to value failed, storage type: [ code: {code}, name: {stored} ], value type name: {requested} ({cause})")]
    ConversionTo {
        code: TypeCode,
        stored: &'static str,
        requested: &'static str,
        #[source]
        cause: CastError,
    },

    #[error("conversion from value failed, storage type: [ code: {code}, name: {stored} ], value type name: {given} ({cause})")]
    ConversionFrom {
        code: TypeCode,
        stored: &'static str,
        given: &'static str,
        #[source]
        cause: CastError,
    },

    #[error("reference read failed, data type: [ code: {code}, name: {stored} ], requested type name: {requested}")]
    TypeMismatch {
        code: TypeCode,
        stored: &'static str,
        requested: &'static str,
    },

    #[error("{operation} is not supported for {mode:?} storage, type: {stored}")]
    UnsupportedOperation {
        operation: &'static str,
        mode: StorageMode,
        stored: &'static str,
    },

    #[error("{comparison} not implemented, type: {type_name}")]
    MissingComparison {
        comparison: Comparison,
        type_name: &'static str,
    },

    #[error("conversion code {code} is already registered for {owner}")]
    CodeTaken { code: TypeCode, owner: &'static str },
}

impl VariantError {
    pub fn missing_comparison<T: ?Sized>(comparison: Comparison) -> Self {
        Self::MissingComparison {
            comparison,
            type_name: type_name::<T>(),
        }
    }

    pub(crate) fn conversion_to<T>(table: &DispatchTable, cause: CastError) -> Self {
        Self::ConversionTo {
            code: table.type_code(),
            stored: table.type_name(),
            requested: type_name::<T>(),
            cause,
        }
    }

    pub(crate) fn conversion_from<T>(table: &DispatchTable, cause: CastError) -> Self {
        Self::ConversionFrom {
            code: table.type_code(),
            stored: table.type_name(),
            given: type_name::<T>(),
            cause,
        }
    }

    pub(crate) fn type_mismatch<T>(table: &DispatchTable) -> Self {
        Self::TypeMismatch {
            code: table.type_code(),
            stored: table.type_name(),
            requested: type_name::<T>(),
        }
    }

    pub(crate) fn unsupported(operation: &'static str, table: &DispatchTable) -> Self {
        Self::UnsupportedOperation {
            operation,
            mode: table.mode(),
            stored: table.type_name(),
        }
    }
}
