//! Containers of variants: an insertion-ordered property list and a variant array.
//!
//! Nesting them inside variants gives an in-memory tree of dynamic values.

use anyval::{codes, CastPolicy, DefaultPolicy, TypeCode};
use log::{debug, warn};
use once_cell::sync::Lazy;

pub mod array;
pub mod property_list;

pub use anyval;
pub use array::VariantArray;
pub use property_list::{Object, PropertyList};

fn register<T: 'static>(code: TypeCode) {
    match DefaultPolicy::registry().register_type_code::<T>(code) {
        Ok(()) => debug!("{} registered with conversion code {}", std::any::type_name::<T>(), code),
        Err(err) => warn!("{}", err),
    }
}

static TYPE_CODES: Lazy<()> = Lazy::new(|| {
    register::<Object>(codes::OBJECT);
    register::<VariantArray>(codes::ARRAY);
});

/// Gives [`Object`] and [`VariantArray`] their conversion codes in the default policy.
///
/// Runs once. Constructing either container calls it, so it only matters for code storing
/// them in a variant some other way.
pub fn register_type_codes() {
    Lazy::force(&TYPE_CODES);
}
