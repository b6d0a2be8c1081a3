//! Concurrency limits for the mapping window.

use crate::error::{Error, Result};
use std::fmt;
use std::num::NonZeroUsize;

/// Upper bound on the number of in-flight transform slots.
///
/// A slot occupies the window from the moment its item is pulled from the
/// source until its value has been handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Concurrency {
    /// At most this many slots at once
    Bounded(NonZeroUsize),
    /// Every available item is scheduled as soon as it is pulled
    Unbounded,
}

impl Concurrency {
    /// Create a bounded limit. Fails for zero.
    pub fn new(limit: usize) -> Result<Self> {
        NonZeroUsize::new(limit)
            .map(Concurrency::Bounded)
            .ok_or_else(|| Error::invalid_concurrency(limit))
    }

    /// The limit that disables the window check entirely.
    pub const fn unbounded() -> Self {
        Concurrency::Unbounded
    }

    /// The numeric limit, or `None` when unbounded.
    pub fn limit(&self) -> Option<usize> {
        match self {
            Concurrency::Bounded(n) => Some(n.get()),
            Concurrency::Unbounded => None,
        }
    }

    /// Whether one more slot fits next to `occupied` existing ones.
    pub fn has_capacity(&self, occupied: usize) -> bool {
        match self {
            Concurrency::Bounded(n) => occupied < n.get(),
            Concurrency::Unbounded => true,
        }
    }
}

impl fmt::Display for Concurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concurrency::Bounded(n) => write!(f, "{n}"),
            Concurrency::Unbounded => f.write_str("unbounded"),
        }
    }
}

impl From<NonZeroUsize> for Concurrency {
    fn from(limit: NonZeroUsize) -> Self {
        Concurrency::Bounded(limit)
    }
}

/// Conversion into a validated [`Concurrency`].
///
/// Invalid values are rejected at the call site, before any scheduling.
pub trait IntoConcurrency {
    /// Validate and convert.
    fn into_concurrency(self) -> Result<Concurrency>;
}

impl IntoConcurrency for Concurrency {
    fn into_concurrency(self) -> Result<Concurrency> {
        Ok(self)
    }
}

impl IntoConcurrency for NonZeroUsize {
    fn into_concurrency(self) -> Result<Concurrency> {
        Ok(Concurrency::Bounded(self))
    }
}

impl IntoConcurrency for usize {
    fn into_concurrency(self) -> Result<Concurrency> {
        Concurrency::new(self)
    }
}

impl IntoConcurrency for Option<usize> {
    fn into_concurrency(self) -> Result<Concurrency> {
        match self {
            Some(limit) => Concurrency::new(limit),
            None => Ok(Concurrency::Unbounded),
        }
    }
}

macro_rules! impl_into_concurrency_int {
    ($($ty:ty),*) => {
        $(
            impl IntoConcurrency for $ty {
                fn into_concurrency(self) -> Result<Concurrency> {
                    usize::try_from(self)
                        .map_err(|_| Error::invalid_concurrency(self))
                        .and_then(Concurrency::new)
                }
            }
        )*
    };
}

impl_into_concurrency_int!(u32, u64, i32, i64);

impl IntoConcurrency for f64 {
    fn into_concurrency(self) -> Result<Concurrency> {
        if self == f64::INFINITY {
            return Ok(Concurrency::Unbounded);
        }
        if !self.is_finite() || self < 1.0 || self.fract() != 0.0 || self > usize::MAX as f64 {
            return Err(Error::invalid_concurrency(self));
        }
        Concurrency::new(self as usize)
    }
}
