//! Observation and result types for a single poll.

/// One query result snapshot.
///
/// A query that can fail transiently reports the failure as [`Observation::Failed`]
/// instead of returning an error, so the poll loop treats it as "not yet true"
/// and keeps going.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation<T> {
    /// The query ran but found nothing (resource not present yet).
    Absent,
    /// The query found a value.
    Present(T),
    /// The query itself failed; the string carries the cause.
    Failed(String),
}

impl<T> Observation<T> {
    /// Build an observation from an optional value.
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Observation::Present(v),
            None => Observation::Absent,
        }
    }

    /// Presence predicate: true only for [`Observation::Present`].
    pub fn is_present(&self) -> bool {
        matches!(self, Observation::Present(_))
    }

    /// True when the query itself reported a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Observation::Failed(_))
    }

    /// Borrow the present value, if any.
    pub fn present(&self) -> Option<&T> {
        match self {
            Observation::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Consume the observation, keeping only a present value.
    pub fn into_present(self) -> Option<T> {
        match self {
            Observation::Present(v) => Some(v),
            _ => None,
        }
    }

    /// Map the present value, leaving `Absent` and `Failed` untouched.
    pub fn map<U, F>(self, f: F) -> Observation<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Observation::Absent => Observation::Absent,
            Observation::Present(v) => Observation::Present(f(v)),
            Observation::Failed(cause) => Observation::Failed(cause),
        }
    }
}

/// Terminal outcome of a poll.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult<T> {
    /// An observation satisfied the predicate.
    Found(T),
    /// The attempt or time budget ran out first.
    NotFound,
}

impl<T> PollResult<T> {
    pub fn is_found(&self) -> bool {
        matches!(self, PollResult::Found(_))
    }

    /// Convert into an `Option`, the absence sentinel callers usually want.
    pub fn found(self) -> Option<T> {
        match self {
            PollResult::Found(v) => Some(v),
            PollResult::NotFound => None,
        }
    }
}

impl<T> From<PollResult<T>> for Option<T> {
    fn from(result: PollResult<T>) -> Self {
        result.found()
    }
}
