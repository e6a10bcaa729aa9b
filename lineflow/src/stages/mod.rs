//! Stage trait and the built-in stage primitives.
//!
//! A stage turns one input item into zero, one or many output items. Stages
//! are driven by [`run_stage`], which pulls one item at a time from its
//! upstream and never asks for item *i+1* before every output of item *i*
//! has been handed downstream.

mod primitives;
mod runner;

pub use primitives::{Apply, Filter, Map, RawMap};
pub use runner::run_stage;

use crate::errors::LineflowResult;
use async_trait::async_trait;

/// Trait for pipeline stages.
///
/// `T` is the input item type; [`Stage::Output`] is what the stage emits.
#[async_trait]
pub trait Stage<T: Send + 'static>: Send + 'static {
    /// The item type this stage emits.
    type Output: Send + 'static;

    /// Returns the name of the stage, used in errors and logs.
    fn name(&self) -> &str;

    /// Processes one item.
    ///
    /// # Returns
    ///
    /// The items to emit downstream, or a transform error that ends the
    /// pipeline.
    async fn process(&mut self, item: T) -> LineflowResult<Applied<Self::Output>>;
}

/// What a stage produced for a single input item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied<U> {
    /// Drop the item.
    Skip,
    /// Emit a single item.
    One(U),
    /// Emit every item, in order.
    Many(Vec<U>),
}

impl<U> Applied<U> {
    /// Returns the number of items this result emits.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Skip => 0,
            Self::One(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    /// Returns true if nothing is emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<U> From<Option<U>> for Applied<U> {
    fn from(value: Option<U>) -> Self {
        value.map_or(Self::Skip, Self::One)
    }
}

impl<U> From<Vec<U>> for Applied<U> {
    fn from(items: Vec<U>) -> Self {
        Self::Many(items)
    }
}

impl<U> IntoIterator for Applied<U> {
    type Item = U;
    type IntoIter = std::iter::Chain<std::option::IntoIter<U>, std::vec::IntoIter<U>>;

    fn into_iter(self) -> Self::IntoIter {
        let (single, many) = match self {
            Self::Skip => (None, Vec::new()),
            Self::One(item) => (Some(item), Vec::new()),
            Self::Many(items) => (None, items),
        };
        single.into_iter().chain(many)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applied_from_option() {
        assert_eq!(Applied::from(Some(3)), Applied::One(3));
        assert_eq!(Applied::<i32>::from(None), Applied::Skip);
    }

    #[test]
    fn test_applied_iterates_in_order() {
        let items: Vec<_> = Applied::from(vec!["a", "b", "c"]).into_iter().collect();
        assert_eq!(items, vec!["a", "b", "c"]);

        assert_eq!(Applied::One(1).into_iter().collect::<Vec<_>>(), vec![1]);
        assert!(Applied::<u8>::Skip.is_empty());
    }
}
