use anyval::{CastError, Variant, VariantError};
use rstest::rstest;

/// The caster's reason behind a conversion error.
fn cause<T>(result: Result<T, VariantError>) -> Option<CastError> {
    match result {
        Err(VariantError::ConversionTo { cause, .. }) | Err(VariantError::ConversionFrom { cause, .. }) => Some(cause),
        _ => None,
    }
}

#[test]
fn string_overflow_rejects_instead_of_wrapping() {
    let text = Variant::from("2147483648");
    assert_eq!(cause(text.get_as::<i32>()), Some(CastError::Overflow));
    assert_eq!(text.get_as::<i64>().unwrap(), 2_147_483_648);

    assert_eq!(cause(Variant::from("-2147483649").get_as::<i32>()), Some(CastError::Underflow));
}

#[rstest]
#[case::i8(Variant::from(-1_i8))]
#[case::i16(Variant::from(-1_i16))]
#[case::i32(Variant::from(-1_i32))]
#[case::i64(Variant::from(-1_i64))]
#[case::isize(Variant::from(-1_isize))]
#[case::float(Variant::from(-1.0_f64))]
fn negative_to_unsigned_rejects(#[case] negative: Variant) {
    assert_eq!(cause(negative.get_as::<u8>()), Some(CastError::Underflow));
    assert_eq!(cause(negative.get_as::<u16>()), Some(CastError::Underflow));
    assert_eq!(cause(negative.get_as::<u32>()), Some(CastError::Underflow));
    assert_eq!(cause(negative.get_as::<u64>()), Some(CastError::Underflow));
    assert_eq!(cause(negative.get_as::<usize>()), Some(CastError::Underflow));
}

#[test]
fn negative_text_to_unsigned_rejects() {
    assert_eq!(cause(Variant::from("-1").get_as::<u32>()), Some(CastError::Underflow));
    assert_eq!(cause(Variant::from("-1").get_as::<u64>()), Some(CastError::Underflow));
    // one character expected for 8-bit targets
    assert!(Variant::from("-1").get_as::<u8>().is_err());
}

#[rstest]
#[case::u64_to_i64(Variant::from(u64::MAX), CastError::Overflow)]
#[case::i64_to_i32(Variant::from(i64::MIN), CastError::Underflow)]
#[case::u32_to_i32(Variant::from(u32::MAX), CastError::Overflow)]
#[case::large_float(Variant::from(1e10_f64), CastError::Overflow)]
#[case::small_float(Variant::from(-1e10_f64), CastError::Underflow)]
#[case::nan(Variant::from(f64::NAN), CastError::NotANumber)]
#[case::garbage(Variant::from("12abc"), CastError::Malformed)]
#[case::empty(Variant::from(""), CastError::Malformed)]
#[case::padded(Variant::from(" 12"), CastError::Malformed)]
#[case::fraction(Variant::from("1.5"), CastError::Malformed)]
fn narrowing_to_i32_is_checked(#[case] source: Variant, #[case] expected: CastError) {
    assert_eq!(cause(source.get_as::<i32>()), Some(expected));
}

#[rstest]
#[case::widening(Variant::from(u32::MAX), 4_294_967_295_i64)]
#[case::truncating_float(Variant::from(3.99_f64), 3)]
#[case::truncating_negative_float(Variant::from(-3.99_f32), -3)]
#[case::text(Variant::from("-42"), -42)]
#[case::boolean(Variant::from(true), 1)]
#[case::null(Variant::new(), 0)]
#[case::pointer_sized(Variant::from(7_usize), 7)]
fn numeric_conversions_preserve_values(#[case] source: Variant, #[case] expected: i64) {
    assert_eq!(source.get_as::<i64>().unwrap(), expected);
}

#[rstest]
#[case::u64_max(Variant::from(u64::MAX))]
#[case::just_above(Variant::from(4_294_967_296_u64))]
fn unsigned_narrowing_to_u32_is_checked(#[case] wide: Variant) {
    assert_eq!(cause(wide.get_as::<u32>()), Some(CastError::Overflow));
}

#[rstest]
#[case::u16(Variant::from(300_u16))]
#[case::u32(Variant::from(256_u32))]
#[case::u64(Variant::from(u64::MAX))]
#[case::usize(Variant::from(1000_usize))]
fn unsigned_narrowing_to_u8_is_checked(#[case] wide: Variant) {
    assert_eq!(cause(wide.get_as::<u8>()), Some(CastError::Overflow));
}

#[test]
fn unsigned_narrowing_keeps_values_in_range() {
    assert_eq!(Variant::from(255_u16).get_as::<u8>().unwrap(), 255);
    assert_eq!(Variant::from(u64::from(u32::MAX)).get_as::<u32>().unwrap(), u32::MAX);
}

#[test]
fn set_value_into_narrower_unsigned_is_checked() -> anyhow::Result<()> {
    let mut byte = Variant::from(7_u8);
    assert_eq!(cause(byte.set_value(300_u64)), Some(CastError::Overflow));
    assert_eq!(cause(byte.set_value(256_u16)), Some(CastError::Overflow));
    assert_eq!(byte.get_as::<u8>()?, 7);

    let mut word = Variant::from(0_u32);
    assert_eq!(cause(word.set_value(u64::MAX)), Some(CastError::Overflow));
    word.set_value(4_000_000_000_u64)?;
    assert_eq!(word.get_as::<u32>()?, 4_000_000_000);
    Ok(())
}

#[test]
fn float_to_u8_checks_the_truncated_value() {
    assert_eq!(Variant::from(255.9_f64).get_as::<u8>().unwrap(), 255);
    assert_eq!(cause(Variant::from(256.0_f64).get_as::<u8>()), Some(CastError::Overflow));
}

#[test]
fn double_to_float_overflow_rejects() {
    assert_eq!(cause(Variant::from(1e39_f64).get_as::<f32>()), Some(CastError::Overflow));
    assert_eq!(cause(Variant::from(-1e39_f64).get_as::<f32>()), Some(CastError::Underflow));
    assert!((Variant::from(0.1_f64).get_as::<f32>().unwrap() - 0.1).abs() < 1e-7);
    assert_eq!(cause(Variant::from("1.0e+39").get_as::<f32>()), Some(CastError::Overflow));
}

#[test]
fn nan_converts_everywhere_but_bool() {
    let nan = Variant::from(f64::NAN);

    assert_eq!(cause(nan.get_as::<bool>()), Some(CastError::NotANumber));
    assert!(nan.get_as::<f64>().unwrap().is_nan());
    assert!(nan.get_as::<f32>().unwrap().is_nan());

    let text = nan.get_as::<String>().unwrap();
    assert!(["nan", "NaN", "NAN"].contains(&text.as_str()), "{text}");

    assert_eq!(cause(Variant::from(f32::NAN).get_as::<bool>()), Some(CastError::NotANumber));
}

#[test]
fn infinity_is_true_and_renders_as_a_token() {
    let infinity = Variant::from(f64::INFINITY);
    assert!(infinity.get_as::<bool>().unwrap());
    assert!(infinity.get_as::<f32>().unwrap().is_infinite());
    assert_eq!(infinity.get_as::<String>().unwrap(), "inf");
    assert_eq!(Variant::from(f64::NEG_INFINITY).get_as::<String>().unwrap(), "-inf");
    assert_eq!(Variant::from("-inf").get_as::<f64>().unwrap(), f64::NEG_INFINITY);
    assert_eq!(cause(infinity.get_as::<i64>()), Some(CastError::Overflow));
}

#[test]
fn decimal_text_echoes_exactly() {
    let text = Variant::value_of(String::from("123.456"));
    assert_eq!(text.get_as::<String>().unwrap(), "123.456");
    assert!((text.get_as::<f64>().unwrap() - 123.456).abs() < 1e-9);
}

#[rstest]
#[case::int(Variant::from(42), "42")]
#[case::negative(Variant::from(-7_i16), "-7")]
#[case::wide(Variant::from(u64::MAX), "18446744073709551615")]
#[case::double(Variant::from(3.14_f64), "3.14")]
#[case::float(Variant::from(0.1_f32), "0.1")]
#[case::yes(Variant::from(true), "true")]
#[case::no(Variant::from(false), "false")]
#[case::null(Variant::new(), "")]
fn values_render_as_text(#[case] source: Variant, #[case] expected: &str) {
    assert_eq!(source.get_as::<String>().unwrap(), expected);
}

#[rstest]
#[case::true_token("true", true)]
#[case::one("1", true)]
#[case::false_token("false", false)]
#[case::zero("0", false)]
#[case::other_number("123", false)]
#[case::empty("", false)]
fn text_to_bool_never_fails(#[case] text: &str, #[case] expected: bool) {
    assert_eq!(Variant::from(text).get_as::<bool>().unwrap(), expected);
}

#[rstest]
#[case::zero(Variant::from(0_u16), false)]
#[case::positive(Variant::from(7_i64), true)]
#[case::negative(Variant::from(-1_i8), true)]
#[case::fraction(Variant::from(-0.5_f64), true)]
#[case::float_zero(Variant::from(0.0_f32), false)]
#[case::null(Variant::new(), false)]
fn numbers_to_bool(#[case] source: Variant, #[case] expected: bool) {
    assert_eq!(source.get_as::<bool>().unwrap(), expected);
}

#[test]
fn bool_to_numbers() {
    assert_eq!(Variant::from(true).get_as::<u8>().unwrap(), 1);
    assert_eq!(Variant::from(false).get_as::<f64>().unwrap(), 0.0);
    assert_eq!(Variant::from(true).get_as::<f32>().unwrap(), 1.0);
}

#[test]
fn eight_bit_values_are_characters_in_text() {
    assert_eq!(Variant::from(65_u8).get_as::<String>().unwrap(), "A");
    assert_eq!(Variant::from("A").get_as::<u8>().unwrap(), 65);
    assert_eq!(Variant::from("z").get_as::<i8>().unwrap(), b'z' as i8);

    assert_eq!(Variant::from(-1_i8).get_as::<String>().unwrap(), "ÿ");
    assert_eq!(Variant::from("ÿ").get_as::<i8>().unwrap(), -1);

    assert_eq!(cause(Variant::from("128").get_as::<u8>()), Some(CastError::Malformed));
    assert_eq!(cause(Variant::from("AB").get_as::<i8>()), Some(CastError::Malformed));
    assert_eq!(cause(Variant::from("€").get_as::<u8>()), Some(CastError::Malformed));

    // numeric sources are still range-checked
    assert_eq!(cause(Variant::from(300_i32).get_as::<u8>()), Some(CastError::Overflow));
    assert_eq!(Variant::from(65_u8).get_as::<i32>().unwrap(), 65);
}

#[test]
fn null_converts_to_zero_values() {
    let null = Variant::new();
    assert_eq!(null.get_as::<i32>().unwrap(), 0);
    assert_eq!(null.get_as::<f64>().unwrap(), 0.0);
    assert!(!null.get_as::<bool>().unwrap());
    assert_eq!(null.get_as::<String>().unwrap(), "");
}

#[test]
fn set_value_converts_into_the_stored_type() -> anyhow::Result<()> {
    let mut number = Variant::from(0_i32);
    number.set_value(String::from("77"))?;
    assert_eq!(number.get_as::<i32>()?, 77);

    assert_eq!(cause(number.set_value(String::from("x"))), Some(CastError::Malformed));
    assert_eq!(number.get_as::<i32>()?, 77);

    let mut text = Variant::from("");
    text.set_value(2.5_f64)?;
    assert!(text.is::<String>());
    assert_eq!(text.get_as::<String>()?, "2.5");

    let mut small = Variant::from(0.0_f32);
    assert_eq!(cause(small.set_value(f64::MAX)), Some(CastError::Overflow));
    small.set_value(f64::NAN)?;
    assert!(small.get_as::<f32>()?.is_nan());
    Ok(())
}

#[test]
fn types_outside_the_palette_do_not_convert() {
    assert_eq!(cause(Variant::value_of(vec![1, 2]).get_as::<i32>()), Some(CastError::Unsupported));
    assert_eq!(cause(Variant::from(1).get_as::<Vec<i32>>()), Some(CastError::Unsupported));

    let wide = Variant::from(5_i128);
    assert_eq!(wide.type_code(), anyval::codes::DEFAULT);
    assert_eq!(wide.get_as::<i128>().unwrap(), 5);
    assert_eq!(cause(wide.get_as::<i32>()), Some(CastError::Unsupported));
}
