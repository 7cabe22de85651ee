use anyval::convert::{default_cast_from, default_cast_to, store, stored};
use anyval::{codes, BasicVariant, CastError, CastPolicy, Caster, CasterRegistry, Cell, DefaultPolicy, TypeCode, Variant, VariantError};
use once_cell::sync::Lazy;
use rstest::rstest;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
struct Celsius(f64);

anyval::storable!(Celsius);

const CELSIUS: TypeCode = codes::FIRST_EXTENSION + 3;

/// Default conversions plus temperatures.
struct ThermoPolicy;

type ThermoVariant = BasicVariant<ThermoPolicy>;

impl Caster<ThermoPolicy> for Celsius {
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
        match src_code {
            CELSIUS => stored::<Celsius>(cell).copied(),
            _ => default_cast_to::<f64>(cell, src_code).map(Celsius),
        }
    }

    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
        match dest_code {
            CELSIUS => store(cell, *value),
            _ => default_cast_from::<f64>(cell, dest_code, &value.0),
        }
    }
}

impl Caster<ThermoPolicy> for f64 {
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
        match src_code {
            CELSIUS => Ok(stored::<Celsius>(cell)?.0),
            _ => default_cast_to(cell, src_code),
        }
    }

    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
        match dest_code {
            CELSIUS => store(cell, Celsius(*value)),
            _ => default_cast_from(cell, dest_code, value),
        }
    }
}

impl Caster<ThermoPolicy> for String {
    fn cast_to_value(cell: &Cell, src_code: TypeCode) -> Result<Self, CastError> {
        match src_code {
            CELSIUS => Ok(format!("{}°C", stored::<Celsius>(cell)?.0)),
            _ => default_cast_to(cell, src_code),
        }
    }

    fn cast_from_value(cell: &mut Cell, dest_code: TypeCode, value: &Self) -> Result<(), CastError> {
        match dest_code {
            CELSIUS => {
                let degrees = value.trim_end_matches("°C").parse().map_err(|_| CastError::Malformed)?;
                store(cell, Celsius(degrees))
            }
            _ => default_cast_from(cell, dest_code, value),
        }
    }
}

static THERMO_REGISTRY: Lazy<CasterRegistry> = Lazy::new(|| {
    CasterRegistry::extending("thermo", DefaultPolicy::registry())
        .with_type_code::<Celsius>(CELSIUS)
        .with_caster::<Celsius, ThermoPolicy>()
        .with_caster::<f64, ThermoPolicy>()
        .with_caster::<String, ThermoPolicy>()
});

impl CastPolicy for ThermoPolicy {
    fn registry() -> &'static CasterRegistry {
        &THERMO_REGISTRY
    }
}

#[test]
fn registered_types_convert_through_their_casters() -> anyhow::Result<()> {
    let room = ThermoVariant::value_of(Celsius(21.5));
    assert_eq!(room.type_code(), CELSIUS);
    assert_eq!(room.get_as::<f64>()?, 21.5);
    assert_eq!(room.get_as::<String>()?, "21.5°C");

    // no i32 caster of this policy knows the code
    assert!(matches!(
        room.get_as::<i32>(),
        Err(VariantError::ConversionTo { cause: CastError::Unsupported, .. })
    ));
    Ok(())
}

#[rstest]
#[case::int(ThermoVariant::from(30_i32), Celsius(30.0))]
#[case::float(ThermoVariant::from(-1.5_f32), Celsius(-1.5))]
#[case::text(ThermoVariant::from("12.25"), Celsius(12.25))]
fn palette_values_become_temperatures(#[case] source: ThermoVariant, #[case] expected: Celsius) {
    assert_eq!(source.get_as::<Celsius>().unwrap(), expected);
}

#[test]
fn set_value_writes_into_a_temperature() -> anyhow::Result<()> {
    let mut room = ThermoVariant::value_of(Celsius::default());
    room.set_value(String::from("-4.5°C"))?;
    assert_eq!(*room.get_ref::<Celsius>()?, Celsius(-4.5));

    room.set_value(18.0_f64)?;
    assert_eq!(room.get_as::<Celsius>()?, Celsius(18.0));

    assert!(room.set_value(String::from("warm")).is_err());
    assert_eq!(room.get_as::<Celsius>()?, Celsius(18.0));

    let mut reading = ThermoVariant::from(0.0_f64);
    reading.set_value(Celsius(37.0))?;
    assert_eq!(reading.get_as::<f64>()?, 37.0);
    Ok(())
}

#[test]
fn palette_conversions_fall_back_to_the_base_registry() {
    assert_eq!(ThermoVariant::from("12").get_as::<i32>().unwrap(), 12);
    assert!(ThermoVariant::from("2147483648").get_as::<i32>().is_err());
    assert_eq!(ThermoPolicy::registry().type_code::<u16>(), codes::U16);
}

#[test]
fn temperatures_are_opaque_to_the_default_policy() {
    let room = Variant::value_of(Celsius(20.0));
    assert_eq!(room.type_code(), codes::DEFAULT);
    assert!(room.get_as::<f64>().is_err());
    assert_eq!(room.get_as::<Celsius>().unwrap(), Celsius(20.0));
}

#[test]
fn codes_owned_by_another_type_are_refused() {
    let registry = CasterRegistry::extending("scratch", DefaultPolicy::registry());

    match registry.register_type_code::<Celsius>(codes::I32) {
        Err(VariantError::CodeTaken { code, owner }) => {
            assert_eq!(code, codes::I32);
            assert_eq!(owner, "i32");
        }
        other => panic!("expected a taken code, got {other:?}"),
    }
    assert_eq!(registry.type_code::<Celsius>(), codes::DEFAULT);
}

#[test]
fn registering_the_same_code_twice_is_a_no_op() {
    #[derive(Debug)]
    struct Kelvin;

    let registry = CasterRegistry::extending("scratch", DefaultPolicy::registry());
    let code = codes::FIRST_EXTENSION + 10;

    assert!(registry.register_type_code::<Celsius>(code).is_ok());
    assert!(registry.register_type_code::<Celsius>(code).is_ok());
    assert!(matches!(registry.register_type_code::<Kelvin>(code), Err(VariantError::CodeTaken { .. })));

    // moving to a new code frees the old one
    assert!(registry.register_type_code::<Celsius>(code + 1).is_ok());
    assert_eq!(registry.type_code::<Celsius>(), code + 1);
    assert!(registry.register_type_code::<Kelvin>(code).is_ok());
    assert_eq!(registry.type_code::<Kelvin>(), code);
}

#[test]
fn casters_are_looked_up_through_the_base() {
    let registry = CasterRegistry::new("empty");
    assert!(!registry.has_caster::<i32>());
    assert_eq!(registry.type_code::<i32>(), codes::DEFAULT);

    let derived = CasterRegistry::extending("derived", DefaultPolicy::registry());
    assert!(derived.has_caster::<i32>());
    assert_eq!(derived.type_code::<String>(), codes::STRING);
    assert_eq!(derived.type_code::<anyval::Null>(), codes::NULL);
}
