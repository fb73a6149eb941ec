//! Deterministic distributions for unit tests.

#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::default_trait_access,
    clippy::cast_precision_loss
)]

use std::cell::Cell;

use rand::distributions::Distribution;

/// This distribution always produces the same value and never touches the random number
/// generator.
///
/// Together with an acceptance test of the form `sample < threshold`, a value of `0.0`
/// accepts everything and a value of `1.0` rejects everything that is not certain.
#[derive(Debug, Clone, Copy)]
pub struct ConstantDistribution<T>(T);

impl<T> ConstantDistribution<T> {
    /// Constructs a distribution that always returns `value`.
    pub fn new(value: T) -> Self {
        Self(value)
    }
}

impl<T: Copy> Distribution<T> for ConstantDistribution<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        self.0
    }
}

/// Returns the given values one after another, starting over after the last one.
///
/// The generator is not used, so the sequence of values is fully predictable regardless of
/// how many other random draws happen in between.
///
/// # Panics
///
/// Sampling panics if the distribution was created with no values.
#[derive(Debug, Clone)]
pub struct CycleDistribution<T> {
    values: Vec<T>,
    position: Cell<usize>,
}

impl<T> CycleDistribution<T> {
    /// Constructs a distribution cycling over `values`.
    pub fn new(values: Vec<T>) -> Self {
        Self {
            values,
            position: Cell::new(0),
        }
    }

    /// Number of values sampled so far.
    #[must_use]
    pub fn draws(&self) -> usize {
        self.position.get()
    }
}

impl<T: Copy> Distribution<T> for CycleDistribution<T> {
    fn sample<R: rand::Rng + ?Sized>(&self, _: &mut R) -> T {
        let position = self.position.get();
        self.position.set(position + 1);
        self.values[position % self.values.len()]
    }
}
