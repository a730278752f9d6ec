//! # Hierarchy structure
//!
//! A map with paths as keys.
//! Suffix of paths are valid keys when non-ambiguous.
//!

use core::fmt;
use itertools::Itertools;
use std::{
    collections::BTreeMap,
    ops::{Deref, Index},
};

/// How many times is the element
enum Found<T> {
    Zero,
    One(T),
    More,
}

/// Found can be converted to Option
impl<T> From<Found<T>> for Option<T> {
    fn from(value: Found<T>) -> Self {
        match value {
            Found::One(t) => Some(t),
            _ => None,
        }
    }
}

/// A trait Path to manage conversions
pub trait Path: Clone {
    fn path(self) -> Vec<String>;
}

impl Path for &str {
    fn path(self) -> Vec<String> {
        vec![self.to_string()]
    }
}

impl Path for String {
    fn path(self) -> Vec<String> {
        vec![self]
    }
}

impl<const N: usize> Path for [&str; N] {
    fn path(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl Path for &[String] {
    fn path(self) -> Vec<String> {
        self.to_vec()
    }
}

impl Path for Vec<&str> {
    fn path(self) -> Vec<String> {
        self.iter().map(|s| s.to_string()).collect()
    }
}

impl Path for Vec<String> {
    fn path(self) -> Vec<String> {
        self
    }
}

/// A utility function to check a path is a suffix of another
fn is_suffix_of(left: &[String], right: &[String]) -> bool {
    left.len() <= right.len()
        && left
            .iter()
            .rev()
            .zip(right.iter().rev())
            .all(|(s, p)| s == p)
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Hierarchy<T: Clone>(BTreeMap<Vec<String>, T>);

impl<T: Clone> Hierarchy<T> {
    pub fn new(objects: BTreeMap<Vec<String>, T>) -> Self {
        Hierarchy(objects)
    }

    pub fn empty() -> Self {
        Hierarchy::new(BTreeMap::new())
    }

    /// Exact match first, then the only path having `path` as a suffix
    pub fn get(&self, path: &[String]) -> Option<&T> {
        self.0.get(path).or_else(|| {
            self.0
                .iter()
                .fold(Found::Zero, |f, (qualified_path, object)| {
                    if is_suffix_of(path, qualified_path) {
                        match f {
                            Found::Zero => Found::One(object),
                            _ => Found::More,
                        }
                    } else {
                        f
                    }
                })
                .into()
        })
    }

    /// Count the paths `path` is a suffix of
    pub fn matches(&self, path: &[String]) -> usize {
        self.0
            .keys()
            .filter(|qualified_path| is_suffix_of(path, qualified_path))
            .count()
    }
}

impl<T: Clone> Deref for Hierarchy<T> {
    type Target = BTreeMap<Vec<String>, T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: Clone> IntoIterator for Hierarchy<T> {
    type Item = <BTreeMap<Vec<String>, T> as IntoIterator>::Item;
    type IntoIter = <BTreeMap<Vec<String>, T> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Create a hierarchy from an iterator
impl<P: Path, T: Clone> FromIterator<(P, T)> for Hierarchy<T> {
    fn from_iter<I: IntoIterator<Item = (P, T)>>(iter: I) -> Self {
        Hierarchy::new(iter.into_iter().map(|(p, o)| (p.path(), o)).collect())
    }
}

/// Create a hierarchy with an array of objects
impl<P: Path, T: Clone, const N: usize> From<[(P, T); N]> for Hierarchy<T> {
    fn from(value: [(P, T); N]) -> Self {
        value.into_iter().collect()
    }
}

/// Index
impl<P: Path, T: Clone> Index<P> for Hierarchy<T> {
    type Output = T;

    fn index(&self, index: P) -> &Self::Output {
        self.get(&index.path()).unwrap()
    }
}

impl<T: Clone + fmt::Display> fmt::Display for Hierarchy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{\n  {},\n}}",
            self.iter()
                .map(|(p, t)| format!("{} -> {}", p.join("."), t))
                .join(",\n  ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        let values = Hierarchy::from([
            (vec!["shop", "orders"], 1),
            (vec!["shop", "customers"], 2),
            (vec!["audit", "orders"], 3),
            (vec!["audit", "events"], 4),
        ]);
        println!("{values}");
        assert_eq!(values[["shop", "orders"]], 1);
        assert_eq!(values[["customers"]], 2);
        assert_eq!(values[["events"]], 4);
        assert_eq!(values.get(&["orders"].path()), None);
        assert_eq!(values.matches(&["orders"].path()), 2);
        assert_eq!(values.get(&["missing"].path()), None);
    }
}
