//! Arbitrary-size integers, added as an extension policy.
//!
//! [`BigNumPolicy`] registers [`BigInt`] on top of the default registry. Its palette casters
//! only handle the `BigInt` code themselves and hand every other conversion to the default
//! policy's casters, which stay untouched.

pub use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use once_cell::sync::Lazy;

use crate::convert::{default_cast_from, default_cast_to, float_to_float, out_of_range, read_operand, store, stored, IntoOperand, Operand};
use crate::error::CastError;
use crate::policy::{codes, CastPolicy, Caster, CasterRegistry, DefaultPolicy, TypeCode};
use crate::storage::Cell;
use crate::variant::BasicVariant;

/// Conversion code of [`BigInt`] under [`BigNumPolicy`].
pub const BIG_INT: TypeCode = codes::FIRST_EXTENSION;

/// Default conversions plus [`BigInt`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BigNumPolicy;

/// A variant that also converts to and from big integers.
pub type BigNumVariant = BasicVariant<BigNumPolicy>;

crate::storable!(BigInt);

/// Palette types built from a big integer.
trait FromBigInt: Sized {
    fn from_big_int(value: &BigInt) -> Result<Self, CastError>;
}

fn exceeds(value: &BigInt) -> CastError {
    out_of_range(value.is_negative())
}

macro_rules! integers_from_big_int {
    ($($ty:ty => $to:ident),* $(,)?) => {$(
        impl FromBigInt for $ty {
            fn from_big_int(value: &BigInt) -> Result<Self, CastError> {
                value.$to().ok_or_else(|| exceeds(value))
            }
        }
    )*};
}

integers_from_big_int!(
    i8 => to_i8,
    i16 => to_i16,
    i32 => to_i32,
    i64 => to_i64,
    isize => to_isize,
    u8 => to_u8,
    u16 => to_u16,
    u32 => to_u32,
    u64 => to_u64,
    usize => to_usize,
);

impl FromBigInt for f64 {
    fn from_big_int(value: &BigInt) -> Result<Self, CastError> {
        value
            .to_f64()
            .filter(|converted| converted.is_finite())
            .ok_or_else(|| exceeds(value))
    }
}

impl FromBigInt for f32 {
    fn from_big_int(value: &BigInt) -> Result<Self, CastError> {
        float_to_float(f64::from_big_int(value)?)
    }
}

impl FromBigInt for bool {
    fn from_big_int(value: &BigInt) -> Result<Self, CastError> {
        Ok(!value.is_zero())
    }
}

impl FromBigInt for String {
    fn from_big_int(value: &BigInt) -> Result<Self, CastError> {
        Ok(value.to_string())
    }
}

fn big_int_from(operand: Operand<'_>) -> Result<BigInt, CastError> {
    match operand {
        Operand::Null => Ok(BigInt::zero()),
        Operand::Bool(value) => Ok(BigInt::from(u8::from(value))),
        Operand::I8(value) => Ok(BigInt::from(value)),
        Operand::U8(value) => Ok(BigInt::from(value)),
        Operand::Signed(value) => Ok(BigInt::from(value)),
        Operand::Unsigned(value) => Ok(BigInt::from(value)),
        Operand::F32(value) => big_int_from(Operand::F64(f64::from(value))),
        Operand::F64(value) if value.is_nan() => Err(CastError::NotANumber),
        Operand::F64(value) => BigInt::from_f64(value.trunc()).ok_or(out_of_range(value.is_sign_negative())),
        Operand::Text(text) => text.parse().map_err(|_| CastError::Malformed),
    }
}

/// Stores a big integer into a cell holding the palette type of code `code`.
fn write_big_int(cell: &mut Cell, code: TypeCode, value: &BigInt) -> Result<(), CastError> {
    match code {
        codes::NULL => Ok(()),
        codes::BOOL => store(cell, bool::from_big_int(value)?),
        codes::F32 => store(cell, f32::from_big_int(value)?),
        codes::F64 => store(cell, f64::from_big_int(value)?),
        codes::STRING => store(cell, String::from_big_int(value)?),
        codes::I8 => store(cell, i8::from_big_int(value)?),
        codes::I16 => store(cell, i16::from_big_int(value)?),
        codes::I32 => store(cell, i32::from_big_int(value)?),
        codes::I64 => store(cell, i64::from_big_int(value)?),
        codes::ISIZE => store(cell, isize::from_big_int(value)?),
        codes::U8 => store(cell, u8::from_big_int(value)?),
        codes::U16 => store(cell, u16::from_big_int(value)?),
        codes::U32 => store(cell, u32::from_big_int(value)?),
        codes::U64 => store(cell, u64::from_big_int(value)?),
        codes::USIZE => store(cell, usize::from_big_int(value)?),
        _ => Err(CastError::Unsupported),
    }
}

impl Caster<BigNumPolicy> for BigInt {
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
        match src_code {
            BIG_INT => stored::<BigInt>(cell).cloned(),
            _ => big_int_from(read_operand(cell, src_code)?),
        }
    }

    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
        match dest_code {
            BIG_INT => store(cell, value.clone()),
            _ => write_big_int(cell, dest_code, value),
        }
    }
}

macro_rules! delegate_casters {
    ($($ty:ty),* $(,)?) => {$(
        impl Caster<BigNumPolicy> for $ty {
            fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
                match src_code {
                    BIG_INT => <$ty>::from_big_int(stored::<BigInt>(cell)?),
                    _ => default_cast_to::<$ty>(cell, src_code),
                }
            }

            fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
                match dest_code {
                    BIG_INT => store(cell, big_int_from(value.to_operand())?),
                    _ => default_cast_from::<$ty>(cell, dest_code, value),
                }
            }
        }
    )*};
}

delegate_casters!(bool, f32, f64, String, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

static BIG_NUM_REGISTRY: Lazy<CasterRegistry> = Lazy::new(|| {
    CasterRegistry::extending("bignum", DefaultPolicy::registry())
        .with_type_code::<BigInt>(BIG_INT)
        .with_caster::<BigInt, BigNumPolicy>()
        .with_caster::<bool, BigNumPolicy>()
        .with_caster::<f32, BigNumPolicy>()
        .with_caster::<f64, BigNumPolicy>()
        .with_caster::<String, BigNumPolicy>()
        .with_caster::<i8, BigNumPolicy>()
        .with_caster::<i16, BigNumPolicy>()
        .with_caster::<i32, BigNumPolicy>()
        .with_caster::<i64, BigNumPolicy>()
        .with_caster::<isize, BigNumPolicy>()
        .with_caster::<u8, BigNumPolicy>()
        .with_caster::<u16, BigNumPolicy>()
        .with_caster::<u32, BigNumPolicy>()
        .with_caster::<u64, BigNumPolicy>()
        .with_caster::<usize, BigNumPolicy>()
});

impl CastPolicy for BigNumPolicy {
    fn registry() -> &'static CasterRegistry {
        &BIG_NUM_REGISTRY
    }
}
