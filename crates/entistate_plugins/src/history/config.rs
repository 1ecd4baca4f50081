//! History configuration.

use super::stack::DEFAULT_MAX_AGE;
use std::fmt;
use std::sync::Arc;

/// Decides whether a change from the first value to the second is recorded.
pub type Comparator<E> = Arc<dyn Fn(&E, &E) -> bool + Send + Sync>;

/// Configuration for entity histories.
pub struct HistoryConfig<E> {
    /// Number of past snapshots kept per entity.
    pub max_age: usize,

    /// Filter applied to each observed change (None = record every change).
    pub comparator: Option<Comparator<E>>,
}

impl<E> Default for HistoryConfig<E> {
    fn default() -> Self {
        Self {
            max_age: DEFAULT_MAX_AGE,
            comparator: None,
        }
    }
}

impl<E> Clone for HistoryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            max_age: self.max_age,
            comparator: self.comparator.clone(),
        }
    }
}

impl<E> HistoryConfig<E> {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of past snapshots kept.
    #[must_use]
    pub fn max_age(mut self, max_age: usize) -> Self {
        self.max_age = max_age;
        self
    }

    /// Records a change only when `comparator(previous, next)` holds.
    #[must_use]
    pub fn comparator(mut self, comparator: impl Fn(&E, &E) -> bool + Send + Sync + 'static) -> Self {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    pub(crate) fn accepts(&self, previous: &E, next: &E) -> bool {
        self.comparator
            .as_ref()
            .map_or(true, |comparator| comparator(previous, next))
    }
}

impl<E> fmt::Debug for HistoryConfig<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryConfig")
            .field("max_age", &self.max_age)
            .field("comparator", &self.comparator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HistoryConfig::<u32>::default();
        assert_eq!(config.max_age, 10);
        assert!(config.accepts(&1, &2));
    }

    #[test]
    fn comparator_filters() {
        let config = HistoryConfig::<u32>::new()
            .max_age(3)
            .comparator(|prev, next| next > prev);
        assert_eq!(config.max_age, 3);
        assert!(config.accepts(&1, &2));
        assert!(!config.accepts(&2, &1));
    }
}
