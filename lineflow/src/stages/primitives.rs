//! Map, RawMap, Filter and Apply.

use super::{Applied, Stage};
use crate::errors::{BoxError, LineflowError, LineflowResult};
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;

/// Emits `f(item)` for every item, awaiting the callback's future.
pub struct Map<F> {
    name: String,
    func: F,
}

impl<F> Map<F> {
    /// Creates a new map stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for Map<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<T, U, F, Fut, E> Stage<T> for Map<F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<U, E>> + Send,
    E: Into<BoxError>,
{
    type Output = U;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: T) -> LineflowResult<Applied<U>> {
        match (self.func)(item).await {
            Ok(value) => Ok(Applied::One(value)),
            Err(e) => Err(LineflowError::transform(&self.name, e)),
        }
    }
}

/// Emits `f(item)` for every item; `f` runs synchronously and cannot fail.
pub struct RawMap<F> {
    name: String,
    func: F,
}

impl<F> RawMap<F> {
    /// Creates a new raw map stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for RawMap<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawMap").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<T, U, F> Stage<T> for RawMap<F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> U + Send + 'static,
{
    type Output = U;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: T) -> LineflowResult<Applied<U>> {
        Ok(Applied::One((self.func)(item)))
    }
}

/// Emits an item unchanged iff its predicate resolves to `true`.
///
/// The predicate receives a clone of the item so its future can own it.
pub struct Filter<F> {
    name: String,
    predicate: F,
}

impl<F> Filter<F> {
    /// Creates a new filter stage.
    pub fn new(name: impl Into<String>, predicate: F) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }
}

impl<F> Debug for Filter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Filter").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<T, F, Fut, E> Stage<T> for Filter<F>
where
    T: Clone + Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<bool, E>> + Send,
    E: Into<BoxError>,
{
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: T) -> LineflowResult<Applied<T>> {
        match (self.predicate)(item.clone()).await {
            Ok(true) => Ok(Applied::One(item)),
            Ok(false) => Ok(Applied::Skip),
            Err(e) => Err(LineflowError::transform(&self.name, e)),
        }
    }
}

/// Generalized filter-map: the callback decides to skip, emit one, or emit many.
pub struct Apply<F> {
    name: String,
    func: F,
}

impl<F> Apply<F> {
    /// Creates a new apply stage.
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Debug for Apply<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Apply").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<T, U, F, Fut, E> Stage<T> for Apply<F>
where
    T: Send + 'static,
    U: Send + 'static,
    F: FnMut(T) -> Fut + Send + 'static,
    Fut: Future<Output = Result<Applied<U>, E>> + Send,
    E: Into<BoxError>,
{
    type Output = U;

    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&mut self, item: T) -> LineflowResult<Applied<U>> {
        (self.func)(item)
            .await
            .map_err(|e| LineflowError::transform(&self.name, e))
    }
}
