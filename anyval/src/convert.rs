//! Conversions between the scalar palette and strings.
//!
//! Every palette value is first read as an [`Operand`], then each target type says how it is
//! built from one. Narrowing is always range-checked, and nothing truncates silently.

use std::num::{IntErrorKind, ParseIntError};
use std::str::FromStr;

use num_traits::{Bounded, Float, NumCast, One, ToPrimitive, Zero};

use crate::error::CastError;
use crate::ops::{OpsOf, StorageOps};
use crate::policy::{codes, CastPolicy, Caster, DefaultPolicy, TypeCode};
use crate::storage::{Cell, Storable};

/// A palette value, as read out of a cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand<'a> {
    Null,
    Bool(bool),
    /// 8-bit values double as characters when rendered to text.
    I8(i8),
    U8(u8),
    Signed(i64),
    Unsigned(u64),
    F32(f32),
    F64(f64),
    Text(&'a str),
}

/// Palette types readable as an [`Operand`].
pub trait IntoOperand {
    fn to_operand(&self) -> Operand<'_>;
}

/// Palette types buildable from an [`Operand`].
pub trait FromOperand: Sized {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError>;
}

/// Borrows the `T` a cell holds.
pub fn stored<T: Storable>(cell: &Cell) -> Result<&T, CastError> {
    <OpsOf<T> as StorageOps<T>>::value_ref(cell).ok_or(CastError::Unsupported)
}

/// Overwrites a cell with a `T`, reusing its heap allocation when there is one.
pub fn store<T: Storable>(cell: &mut Cell, value: T) -> Result<(), CastError> {
    <OpsOf<T> as StorageOps<T>>::assign(cell, value);
    Ok(())
}

/// Reads the palette value held by `cell`, whose stored type has code `code`.
pub fn read_operand(cell: &Cell, code: TypeCode) -> Result<Operand<'_>, CastError> {
    Ok(match code {
        codes::NULL => Operand::Null,
        codes::BOOL => stored::<bool>(cell)?.to_operand(),
        codes::F32 => stored::<f32>(cell)?.to_operand(),
        codes::F64 => stored::<f64>(cell)?.to_operand(),
        codes::STRING => stored::<String>(cell)?.to_operand(),
        codes::I8 => stored::<i8>(cell)?.to_operand(),
        codes::I16 => stored::<i16>(cell)?.to_operand(),
        codes::I32 => stored::<i32>(cell)?.to_operand(),
        codes::I64 => stored::<i64>(cell)?.to_operand(),
        codes::ISIZE => stored::<isize>(cell)?.to_operand(),
        codes::U8 => stored::<u8>(cell)?.to_operand(),
        codes::U16 => stored::<u16>(cell)?.to_operand(),
        codes::U32 => stored::<u32>(cell)?.to_operand(),
        codes::U64 => stored::<u64>(cell)?.to_operand(),
        codes::USIZE => stored::<usize>(cell)?.to_operand(),
        _ => return Err(CastError::Unsupported),
    })
}

/// Converts `operand` to the palette type of code `code` and stores it in `cell`.
///
/// Writing into a null cell accepts anything and leaves it null.
pub fn write_operand(cell: &mut Cell, code: TypeCode, operand: Operand<'_>) -> Result<(), CastError> {
    match code {
        codes::NULL => Ok(()),
        codes::BOOL => store(cell, bool::from_operand(operand)?),
        codes::F32 => store(cell, f32::from_operand(operand)?),
        codes::F64 => store(cell, f64::from_operand(operand)?),
        codes::STRING => store(cell, String::from_operand(operand)?),
        codes::I8 => store(cell, i8::from_operand(operand)?),
        codes::I16 => store(cell, i16::from_operand(operand)?),
        codes::I32 => store(cell, i32::from_operand(operand)?),
        codes::I64 => store(cell, i64::from_operand(operand)?),
        codes::ISIZE => store(cell, isize::from_operand(operand)?),
        codes::U8 => store(cell, u8::from_operand(operand)?),
        codes::U16 => store(cell, u16::from_operand(operand)?),
        codes::U32 => store(cell, u32::from_operand(operand)?),
        codes::U64 => store(cell, u64::from_operand(operand)?),
        codes::USIZE => store(cell, usize::from_operand(operand)?),
        _ => Err(CastError::Unsupported),
    }
}

impl<T> Caster<DefaultPolicy> for T
where
    T: Storable + FromOperand + IntoOperand,
{
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
        T::from_operand(read_operand(cell, src_code)?)
    }

    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
        write_operand(cell, dest_code, value.to_operand())
    }
}

/// Shorthand for the default policy's caster of `T`, for policies delegating to it.
pub fn default_cast_to<T: Caster<DefaultPolicy>>(cell: &Cell, src_code: TypeCode) -> Result<T, CastError> {
    <T as Caster<DefaultPolicy>>::cast_to_value(cell, src_code)
}

pub fn default_cast_from<T: Caster<DefaultPolicy>>(cell: &mut Cell, dest_code: TypeCode, value: &T) -> Result<(), CastError> {
    <T as Caster<DefaultPolicy>>::cast_from_value(cell, dest_code, value)
}

/// Whether `P` can turn what `cell` holds into a `T`, probing the actual value.
pub fn can_cast<T: 'static, P: CastPolicy>(cell: &Cell, src_code: TypeCode) -> bool {
    P::registry().cast_to_value::<T>(cell, src_code).is_ok()
}

/// Range error for a value that did not fit, by its sign.
pub fn out_of_range(negative: bool) -> CastError {
    if negative {
        CastError::Underflow
    } else {
        CastError::Overflow
    }
}

fn narrow<S, T>(value: S) -> Result<T, CastError>
where
    S: ToPrimitive + Zero + PartialOrd + Copy,
    T: NumCast,
{
    <T as NumCast>::from(value).ok_or_else(|| out_of_range(value < S::zero()))
}

/// Float to integer: drops the fraction, then checks the range.
fn narrow_float<S: Float, T: NumCast>(value: S) -> Result<T, CastError> {
    if value.is_nan() {
        return Err(CastError::NotANumber);
    }
    narrow(value.trunc())
}

/// Float to float: NaN and infinities pass through, finite values must fit.
pub fn float_to_float<S: Float, T: Float>(value: S) -> Result<T, CastError> {
    if value.is_nan() {
        return Ok(T::nan());
    }
    if value.is_infinite() {
        return Ok(if value.is_sign_negative() { T::neg_infinity() } else { T::infinity() });
    }
    <T as NumCast>::from(value)
        .filter(|converted| converted.is_finite())
        .ok_or_else(|| out_of_range(value.is_sign_negative()))
}

fn parse_integer<T>(text: &str) -> Result<T, CastError>
where
    T: FromStr<Err = ParseIntError> + Bounded + Zero + PartialEq,
{
    text.parse::<T>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow => CastError::Overflow,
        IntErrorKind::NegOverflow => CastError::Underflow,
        IntErrorKind::InvalidDigit if T::min_value() == T::zero() && is_negative_integer(text) => CastError::Underflow,
        _ => CastError::Malformed,
    })
}

fn is_negative_integer(text: &str) -> bool {
    text.strip_prefix('-')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|digit| digit.is_ascii_digit()))
}

/// Exactly one character, no wider than a byte.
fn parse_character(text: &str) -> Result<u8, CastError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(character), None) => u8::try_from(character).map_err(|_| CastError::Malformed),
        _ => Err(CastError::Malformed),
    }
}

fn parse_float<F: Float + FromStr>(text: &str) -> Result<F, CastError> {
    let value: F = text.parse().map_err(|_| CastError::Malformed)?;
    if value.is_infinite() && !names_infinity(text) {
        return Err(out_of_range(value.is_sign_negative()));
    }
    Ok(value)
}

fn names_infinity(text: &str) -> bool {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn integer_from<T>(operand: Operand<'_>, parse: fn(&str) -> Result<T, CastError>) -> Result<T, CastError>
where
    T: NumCast + Zero + One,
{
    match operand {
        Operand::Null => Ok(T::zero()),
        Operand::Bool(value) => Ok(if value { T::one() } else { T::zero() }),
        Operand::I8(value) => narrow(value),
        Operand::U8(value) => narrow(value),
        Operand::Signed(value) => narrow(value),
        Operand::Unsigned(value) => narrow(value),
        Operand::F32(value) => narrow_float(value),
        Operand::F64(value) => narrow_float(value),
        Operand::Text(text) => parse(text),
    }
}

fn float_from<F: Float + FromStr>(operand: Operand<'_>) -> Result<F, CastError> {
    match operand {
        Operand::Null => Ok(F::zero()),
        Operand::Bool(value) => Ok(if value { F::one() } else { F::zero() }),
        Operand::I8(value) => narrow(value),
        Operand::U8(value) => narrow(value),
        Operand::Signed(value) => narrow(value),
        Operand::Unsigned(value) => narrow(value),
        Operand::F32(value) => float_to_float(value),
        Operand::F64(value) => float_to_float(value),
        Operand::Text(text) => parse_float(text),
    }
}

macro_rules! integer_operands {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl IntoOperand for $ty {
            fn to_operand(&self) -> Operand<'_> {
                Operand::$variant((*self).into())
            }
        }

        impl FromOperand for $ty {
            fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
                integer_from(operand, parse_integer::<$ty>)
            }
        }
    )*};
}

integer_operands!(
    i16 => Signed,
    i32 => Signed,
    i64 => Signed,
    u16 => Unsigned,
    u32 => Unsigned,
    u64 => Unsigned,
);

// `isize`/`usize` have no lossless `Into<i64>`, but are never wider than 64 bits here.
static_assertions::const_assert!(std::mem::size_of::<usize>() <= std::mem::size_of::<u64>());

impl IntoOperand for isize {
    fn to_operand(&self) -> Operand<'_> {
        Operand::Signed(*self as i64)
    }
}

impl FromOperand for isize {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        integer_from(operand, parse_integer::<isize>)
    }
}

impl IntoOperand for usize {
    fn to_operand(&self) -> Operand<'_> {
        Operand::Unsigned(*self as u64)
    }
}

impl FromOperand for usize {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        integer_from(operand, parse_integer::<usize>)
    }
}

impl IntoOperand for i8 {
    fn to_operand(&self) -> Operand<'_> {
        Operand::I8(*self)
    }
}

impl FromOperand for i8 {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        integer_from(operand, |text| parse_character(text).map(|byte| byte as i8))
    }
}

impl IntoOperand for u8 {
    fn to_operand(&self) -> Operand<'_> {
        Operand::U8(*self)
    }
}

impl FromOperand for u8 {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        integer_from(operand, parse_character)
    }
}

impl IntoOperand for f32 {
    fn to_operand(&self) -> Operand<'_> {
        Operand::F32(*self)
    }
}

impl FromOperand for f32 {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        float_from(operand)
    }
}

impl IntoOperand for f64 {
    fn to_operand(&self) -> Operand<'_> {
        Operand::F64(*self)
    }
}

impl FromOperand for f64 {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        float_from(operand)
    }
}

impl IntoOperand for bool {
    fn to_operand(&self) -> Operand<'_> {
        Operand::Bool(*self)
    }
}

impl FromOperand for bool {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        match operand {
            Operand::Null => Ok(false),
            Operand::Bool(value) => Ok(value),
            Operand::I8(value) => Ok(value != 0),
            Operand::U8(value) => Ok(value != 0),
            Operand::Signed(value) => Ok(value != 0),
            Operand::Unsigned(value) => Ok(value != 0),
            Operand::F32(value) if value.is_nan() => Err(CastError::NotANumber),
            Operand::F64(value) if value.is_nan() => Err(CastError::NotANumber),
            Operand::F32(value) => Ok(value != 0.0),
            Operand::F64(value) => Ok(value != 0.0),
            // never fails: anything but these two tokens reads as false
            Operand::Text(text) => Ok(text == "true" || text == "1"),
        }
    }
}

impl IntoOperand for String {
    fn to_operand(&self) -> Operand<'_> {
        Operand::Text(self)
    }
}

impl FromOperand for String {
    fn from_operand(operand: Operand<'_>) -> Result<Self, CastError> {
        Ok(match operand {
            Operand::Null => String::new(),
            Operand::Bool(value) => value.to_string(),
            Operand::I8(value) => char::from(value as u8).to_string(),
            Operand::U8(value) => char::from(value).to_string(),
            Operand::Signed(value) => value.to_string(),
            Operand::Unsigned(value) => value.to_string(),
            Operand::F32(value) => value.to_string(),
            Operand::F64(value) => value.to_string(),
            Operand::Text(text) => text.to_owned(),
        })
    }
}
