//! Utilities for configuration variables.

use std::cmp;

//------------ DefMinMax -----------------------------------------------------

/// A configuration variable with a default and a permitted range.
///
/// Setters of configuration values use this to silently cap values that
/// fall outside the permitted range rather than failing.
#[derive(Clone, Copy)]
pub struct DefMinMax<T> {
    /// The default value.
    def: T,

    /// The smallest permitted value.
    min: T,

    /// The largest permitted value.
    max: T,
}

impl<T> DefMinMax<T> {
    /// Creates a new value.
    pub const fn new(def: T, min: T, max: T) -> Self {
        Self { def, min, max }
    }

    /// Returns the default value.
    pub fn default(self) -> T {
        self.def
    }

    /// Caps the given value so it fits into the permitted range.
    pub fn clamp(self, value: T) -> T
    where
        T: Ord,
    {
        cmp::max(self.min, cmp::min(self.max, value))
    }
}
