use std::cmp::Ordering;
use std::ops::{Index, IndexMut};
use std::slice;

use anyhow::{bail, Context, Result};

use anyval::Variant;

/// A growable list of variants.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub struct VariantArray {
    items: Vec<Variant>,
}

anyval::storable!(VariantArray);

/// Builds a [`VariantArray`], converting each element with `Variant::from`.
///
/// ```
/// let mixed = anyval_collections::array_of![10, "hello", 3.14, true];
/// assert!(mixed[1].is::<String>());
/// ```
#[macro_export]
macro_rules! array_of {
    ($($item:expr),* $(,)?) => {
        $crate::VariantArray::of_nodes(::std::vec![$($crate::anyval::Variant::from($item)),*])
    };
}

/// Ascending order for sorting. Values that cannot be ordered against each other count as equal.
fn sort_order(lhs: &Variant, rhs: &Variant) -> Ordering {
    if matches!(lhs.try_less(rhs), Ok(true)) {
        Ordering::Less
    } else if matches!(rhs.try_less(lhs), Ok(true)) {
        Ordering::Greater
    } else {
        Ordering::Equal
    }
}

impl VariantArray {
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        crate::register_type_codes();
        Self {
            items: Vec::with_capacity(capacity),
        }
    }

    pub fn of_nodes(nodes: impl IntoIterator<Item = Variant>) -> Self {
        let mut array = Self::new();
        array.items.extend(nodes);
        array
    }

    pub fn push(&mut self, value: impl Into<Variant>) {
        self.items.push(value.into());
    }

    /// Inserts before `index`; `index == len()` appends.
    pub fn insert(&mut self, index: usize, value: impl Into<Variant>) -> Result<()> {
        if index > self.items.len() {
            bail!("insert position {} out of range, length {}", index, self.items.len());
        }
        self.items.insert(index, value.into());
        Ok(())
    }

    /// Removes and returns the element at `index`.
    pub fn erase(&mut self, index: usize) -> Result<Variant> {
        if index >= self.items.len() {
            bail!("index {} out of range, length {}", index, self.items.len());
        }
        Ok(self.items.remove(index))
    }

    pub fn at(&self, index: usize) -> Result<&Variant> {
        let len = self.items.len();
        self.items
            .get(index)
            .with_context(|| format!("index {} out of range, length {}", index, len))
    }

    pub fn at_mut(&mut self, index: usize) -> Result<&mut Variant> {
        let len = self.items.len();
        self.items
            .get_mut(index)
            .with_context(|| format!("index {} out of range, length {}", index, len))
    }

    pub fn get(&self, index: usize) -> Option<&Variant> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Variant> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn reserve(&mut self, additional: usize) {
        self.items.reserve(additional);
    }

    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Grows with null variants or truncates.
    pub fn resize(&mut self, len: usize) {
        self.items.resize_with(len, Variant::new);
    }

    pub fn iter(&self) -> slice::Iter<'_, Variant> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<'_, Variant> {
        self.items.iter_mut()
    }

    /// Stable sort: by conversion code, then by value within a type.
    pub fn sort(&mut self) {
        self.items.sort_by(sort_order);
    }

    pub fn is_sorted(&self) -> bool {
        self.items
            .windows(2)
            .all(|pair| sort_order(&pair[0], &pair[1]) != Ordering::Greater)
    }

    pub fn as_slice(&self) -> &[Variant] {
        &self.items
    }
}

impl Default for VariantArray {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for VariantArray {
    type Output = Variant;

    fn index(&self, index: usize) -> &Variant {
        &self.items[index]
    }
}

impl IndexMut<usize> for VariantArray {
    fn index_mut(&mut self, index: usize) -> &mut Variant {
        &mut self.items[index]
    }
}

impl FromIterator<Variant> for VariantArray {
    fn from_iter<I: IntoIterator<Item = Variant>>(iter: I) -> Self {
        Self::of_nodes(iter)
    }
}

impl Extend<Variant> for VariantArray {
    fn extend<I: IntoIterator<Item = Variant>>(&mut self, iter: I) {
        self.items.extend(iter);
    }
}

impl IntoIterator for VariantArray {
    type Item = Variant;
    type IntoIter = std::vec::IntoIter<Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a VariantArray {
    type Item = &'a Variant;
    type IntoIter = slice::Iter<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<'a> IntoIterator for &'a mut VariantArray {
    type Item = &'a mut Variant;
    type IntoIter = slice::IterMut<'a, Variant>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter_mut()
    }
}
