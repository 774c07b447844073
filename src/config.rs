use std::fmt::{self, Display, Formatter};

use crate::{util::Duration, Error, Result};

/// An optional upper bound.
///
/// Front ends pass limits as integers where `-1` means "no limit";
/// [`Limit::try_from`] accepts that convention and rejects other negative
/// values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum Limit {
    #[default]
    Unbounded,
    At(usize),
}

impl Limit {
    /// Is `n` within the limit (`n <= limit`)?
    pub fn allows(self, n: usize) -> bool {
        match self {
            Limit::Unbounded => true,
            Limit::At(limit) => n <= limit,
        }
    }

    /// Has a count of `n` used up the limit (`n >= limit`)?
    pub fn reached(self, n: usize) -> bool {
        match self {
            Limit::Unbounded => false,
            Limit::At(limit) => n >= limit,
        }
    }

    /// The limit one level further down a search, or `None` when it is
    /// spent.
    pub fn decrement(self) -> Option<Limit> {
        match self {
            Limit::Unbounded => Some(Limit::Unbounded),
            Limit::At(0) => None,
            Limit::At(n) => Some(Limit::At(n - 1)),
        }
    }

    /// Clamp `n` to the limit.
    pub fn min(self, n: usize) -> usize {
        match self {
            Limit::Unbounded => n,
            Limit::At(limit) => n.min(limit),
        }
    }
}

impl TryFrom<i64> for Limit {
    type Error = Error;
    fn try_from(n: i64) -> Result<Self> {
        match n {
            -1 => Ok(Limit::Unbounded),
            n if n < 0 => Err(Error::InvalidConfig(format!(
                "limit must be -1 (unbounded) or non-negative, got {}",
                n
            ))),
            n => Ok(Limit::At(n as usize)),
        }
    }
}

impl Display for Limit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => write!(f, "unbounded"),
            Limit::At(n) => write!(f, "{}", n),
        }
    }
}

/// Which temporaries a search is allowed to introduce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub enum SubstituteTarget {
    /// Any category.
    #[default]
    Temps,
    /// Only candidates that do not depend on a sigma vector.
    Reused,
    /// Only scalars.
    Scalars,
}

/// Options of a factorization search.
///
/// Build one with the `with_*` methods:
/// ```
/// use tensor_factor::{Config, Limit};
///
/// let config = Config::default()
///     .with_max_depth(Limit::At(2))
///     .with_batched(true)
///     .with_threads(2);
/// assert!(config.validate().is_ok());
/// assert!(config.with_threads(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-1", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Deepest sub-expression considered as a candidate.
    pub max_depth: Limit,
    /// Most temporaries per category.
    pub max_temps: Limit,
    /// Commit several candidates per pass, and escalate the search depth
    /// starting from one.
    pub batched: bool,
    /// Most candidates committed per pass when batched.
    pub batch_size: Limit,
    pub allow_scalars: bool,
    /// Declare sigma-independent intermediates in their own category.
    pub separate_reused: bool,
    /// Workers used to evaluate candidates.
    pub threads: usize,
    pub target: SubstituteTarget,
    /// Consecutive fruitless passes at full depth before giving up.
    pub retry_limit: usize,
    /// Stop once this few candidates remain and all are additions.
    pub addition_exit_threshold: usize,
    /// Times the final renumbering of temporaries is applied.
    pub reindex_passes: usize,
    /// Do not keep derived data on expression nodes.
    pub low_memory: bool,
    pub time_limit: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: Limit::Unbounded,
            max_temps: Limit::Unbounded,
            batched: false,
            batch_size: Limit::At(10),
            allow_scalars: true,
            separate_reused: false,
            threads: std::thread::available_parallelism().map_or(1, |n| n.get()),
            target: SubstituteTarget::Temps,
            retry_limit: 5,
            addition_exit_threshold: 5,
            reindex_passes: 3,
            low_memory: false,
            time_limit: None,
        }
    }
}

impl Config {
    pub fn with_max_depth(self, max_depth: Limit) -> Self {
        Self { max_depth, ..self }
    }

    pub fn with_max_temps(self, max_temps: Limit) -> Self {
        Self { max_temps, ..self }
    }

    pub fn with_batched(self, batched: bool) -> Self {
        Self { batched, ..self }
    }

    pub fn with_batch_size(self, batch_size: Limit) -> Self {
        Self { batch_size, ..self }
    }

    pub fn with_allow_scalars(self, allow_scalars: bool) -> Self {
        Self {
            allow_scalars,
            ..self
        }
    }

    pub fn with_separate_reused(self, separate_reused: bool) -> Self {
        Self {
            separate_reused,
            ..self
        }
    }

    pub fn with_threads(self, threads: usize) -> Self {
        Self { threads, ..self }
    }

    pub fn with_target(self, target: SubstituteTarget) -> Self {
        Self { target, ..self }
    }

    pub fn with_retry_limit(self, retry_limit: usize) -> Self {
        Self {
            retry_limit,
            ..self
        }
    }

    pub fn with_addition_exit_threshold(self, addition_exit_threshold: usize) -> Self {
        Self {
            addition_exit_threshold,
            ..self
        }
    }

    pub fn with_reindex_passes(self, reindex_passes: usize) -> Self {
        Self {
            reindex_passes,
            ..self
        }
    }

    pub fn with_low_memory(self, low_memory: bool) -> Self {
        Self { low_memory, ..self }
    }

    pub fn with_time_limit(self, time_limit: Duration) -> Self {
        Self {
            time_limit: Some(time_limit),
            ..self
        }
    }

    /// Reject option combinations the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::InvalidConfig(
                "the number of threads must be positive".into(),
            ));
        }
        if self.batch_size == Limit::At(0) {
            return Err(Error::InvalidConfig(
                "the batch size must be positive or unbounded".into(),
            ));
        }
        if self.max_depth == Limit::At(0) {
            return Err(Error::InvalidConfig(
                "the maximum depth must be positive or unbounded".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_limits() {
        assert_eq!(Limit::try_from(-1).unwrap(), Limit::Unbounded);
        assert_eq!(Limit::try_from(3).unwrap(), Limit::At(3));
        assert!(matches!(
            Limit::try_from(-2),
            Err(Error::InvalidConfig(_))
        ));

        assert!(Limit::At(2).allows(2));
        assert!(!Limit::At(2).allows(3));
        assert!(Limit::At(0).reached(0));
        assert!(!Limit::Unbounded.reached(usize::MAX));
        assert_eq!(Limit::At(1).decrement(), Some(Limit::At(0)));
        assert_eq!(Limit::At(0).decrement(), None);
    }

    #[test]
    fn validation() {
        let config = Config::default();
        assert!(config.threads > 0);
        assert!(config.validate().is_ok());
        assert!(config.clone().with_batch_size(Limit::At(0)).validate().is_err());
        assert!(config.clone().with_max_depth(Limit::At(0)).validate().is_err());
        assert!(config.with_batch_size(Limit::Unbounded).validate().is_ok());
    }
}
