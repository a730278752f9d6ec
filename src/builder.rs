//! # Builder utilities
//!
//! This module contains utilities to ease and standardize the writing of builders
//! such as: [crate::schema::builder::TableBuilder]
//!

use std::error;

/// A trait for builder ad-hoc polymorphism
pub trait With<Input, Output = Self> {
    fn with(self, input: Input) -> Output;
}

pub trait WithIterator<Input> {
    fn with_iter<I: IntoIterator<Item = Input>>(self, iter: I) -> Self;
}

impl<Input, W: With<Input>> WithIterator<Input> for W {
    fn with_iter<I: IntoIterator<Item = Input>>(self, iter: I) -> Self {
        iter.into_iter().fold(self, |w, i| w.with(i))
    }
}

/// A trait enabling build when a builder is ready
pub trait Ready<Output>: Sized {
    type Error: error::Error;
    /// Build and panic in case of error
    fn build(self) -> Output {
        self.try_build().unwrap()
    }
    /// Try to build
    fn try_build(self) -> Result<Output, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, Default)]
    struct Words(Vec<String>);

    #[derive(Debug)]
    struct Empty;

    impl fmt::Display for Empty {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "no words")
        }
    }

    impl error::Error for Empty {}

    impl With<&str> for Words {
        fn with(mut self, input: &str) -> Self {
            self.0.push(input.to_string());
            self
        }
    }

    impl Ready<String> for Words {
        type Error = Empty;

        fn try_build(self) -> Result<String, Empty> {
            if self.0.is_empty() {
                Err(Empty)
            } else {
                Ok(self.0.join(" "))
            }
        }
    }

    #[test]
    fn test_with_iter() {
        let words = Words::default().with("hello").with_iter(["brave", "new", "world"]);
        assert_eq!(words.build(), "hello brave new world");
        assert!(Words::default().try_build().is_err());
    }
}
