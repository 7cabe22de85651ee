//! Heap storage for the standard containers.
//!
//! Comparisons go through the elements' own [`Storable`] hooks, so a container of values
//! without comparisons is still storable and only fails once it is compared.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;

use crate::error::{Comparison, VariantError};
use crate::ops::HeapOps;
use crate::storage::{Storable, StorageMode, TypeShape};

static_assertions::const_assert!(StorageMode::classify(TypeShape::compound::<Vec<u8>>()).is_owned_heap());
static_assertions::const_assert!(StorageMode::classify(TypeShape::compound::<Option<u8>>()).is_owned_heap());

fn iter_equals<'a, T: Storable>(
    mut lhs: impl Iterator<Item = &'a T>,
    mut rhs: impl Iterator<Item = &'a T>,
) -> Result<bool, VariantError> {
    loop {
        match (lhs.next(), rhs.next()) {
            (None, None) => return Ok(true),
            (Some(lhs), Some(rhs)) => {
                if !lhs.equals(rhs)? {
                    return Ok(false);
                }
            }
            _ => return Ok(false),
        }
    }
}

/// Lexicographic: the first element ordered either way decides, a prefix is less.
fn iter_less<'a, T: Storable>(
    mut lhs: impl Iterator<Item = &'a T>,
    mut rhs: impl Iterator<Item = &'a T>,
) -> Result<bool, VariantError> {
    loop {
        match (lhs.next(), rhs.next()) {
            (None, rhs) => return Ok(rhs.is_some()),
            (Some(_), None) => return Ok(false),
            (Some(lhs), Some(rhs)) => {
                if lhs.less(rhs)? {
                    return Ok(true);
                }
                if rhs.less(lhs)? {
                    return Ok(false);
                }
            }
        }
    }
}

impl<T: Storable> Storable for Vec<T> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        iter_equals(self.iter(), other.iter())
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        iter_less(self.iter(), other.iter())
    }
}

impl<T: Storable, const N: usize> Storable for [T; N] {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        iter_equals(self.iter(), other.iter())
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        iter_less(self.iter(), other.iter())
    }
}

impl<T: Storable> Storable for Box<T> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        (**self).equals(other)
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        (**self).less(other)
    }
}

/// `None` is less than any `Some`.
impl<T: Storable> Storable for Option<T> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        match (self, other) {
            (Some(lhs), Some(rhs)) => lhs.equals(rhs),
            (lhs, rhs) => Ok(lhs.is_none() && rhs.is_none()),
        }
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        match (self, other) {
            (Some(lhs), Some(rhs)) => lhs.less(rhs),
            (lhs, rhs) => Ok(lhs.is_none() && rhs.is_some()),
        }
    }
}

macro_rules! storable_tuples {
    ($(($($name:ident . $idx:tt),+))*) => {$(
        impl<$($name: Storable),+> Storable for ($($name,)+) {
            type Storage = HeapOps;

            fn equals(&self, other: &Self) -> Result<bool, VariantError> {
                $(
                    if !self.$idx.equals(&other.$idx)? {
                        return Ok(false);
                    }
                )+
                Ok(true)
            }

            fn less(&self, other: &Self) -> Result<bool, VariantError> {
                $(
                    if self.$idx.less(&other.$idx)? {
                        return Ok(true);
                    }
                    if other.$idx.less(&self.$idx)? {
                        return Ok(false);
                    }
                )+
                Ok(false)
            }
        }
    )*};
}

storable_tuples! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
    (A.0, B.1, C.2, D.3, E.4)
    (A.0, B.1, C.2, D.3, E.4, F.5)
}

/// Maps are equal with the same keys mapped to equal values. They have no order.
impl<K, V> Storable for HashMap<K, V>
where
    K: Eq + Hash + Clone + 'static,
    V: Storable,
{
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        if self.len() != other.len() {
            return Ok(false);
        }
        for (key, value) in self {
            match other.get(key) {
                Some(other_value) if value.equals(other_value)? => {}
                _ => return Ok(false),
            }
        }
        Ok(true)
    }

    fn less(&self, _other: &Self) -> Result<bool, VariantError> {
        Err(VariantError::missing_comparison::<Self>(Comparison::Ordering))
    }
}

/// Entries compare in key order: keys with `<`, then values through their hooks.
impl<K, V> Storable for BTreeMap<K, V>
where
    K: Ord + Clone + 'static,
    V: Storable,
{
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        if self.len() != other.len() || !self.keys().eq(other.keys()) {
            return Ok(false);
        }
        iter_equals(self.values(), other.values())
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        let mut rhs = other.iter();
        for (key, value) in self {
            let Some((other_key, other_value)) = rhs.next() else {
                return Ok(false);
            };
            if key != other_key {
                return Ok(key < other_key);
            }
            if value.less(other_value)? {
                return Ok(true);
            }
            if other_value.less(value)? {
                return Ok(false);
            }
        }
        Ok(rhs.next().is_some())
    }
}

impl<T: Eq + Hash + Clone + 'static> Storable for HashSet<T> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        Ok(self == other)
    }
}

impl<T: Ord + Clone + 'static> Storable for BTreeSet<T> {
    type Storage = HeapOps;

    fn equals(&self, other: &Self) -> Result<bool, VariantError> {
        Ok(self == other)
    }

    fn less(&self, other: &Self) -> Result<bool, VariantError> {
        Ok(self < other)
    }
}

crate::storable!(&'static str);
