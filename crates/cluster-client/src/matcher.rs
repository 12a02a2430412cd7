//! Predicates over query observations.

use crate::error::ClusterError;
use poller::Observation;
use regex::Regex;
use serde_json::Value;

/// Full-match pattern for resource names (`app-.*` matches `app-7d9f` but not
/// `my-app-7d9f`).
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    regex: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&format!("^(?:{pattern})$"))?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// First whitespace-separated name in `list` that matches.
    pub fn first_match<'a>(&self, list: &'a str) -> Option<&'a str> {
        list.split_whitespace().find(|name| self.matches(name))
    }
}

/// How a status observation is compared with the expected value.
#[derive(Debug, Clone)]
pub enum StatusMatch {
    /// The whole (trimmed) output equals the value.
    Exact(String),
    /// Every whitespace-separated token equals the value, and there is at
    /// least one. Suits jsonpath lists such as `{.status.conditions[*].status}`.
    AllTokens(String),
    /// At least one token equals the value.
    AnyToken(String),
    /// The regex matches somewhere in the output.
    Pattern(Regex),
    /// The output parses as JSON and the value at `pointer` equals `expected`.
    JsonPointer { pointer: String, expected: Value },
}

impl StatusMatch {
    pub fn exact(value: impl Into<String>) -> Self {
        StatusMatch::Exact(value.into())
    }

    pub fn all_tokens(value: impl Into<String>) -> Self {
        StatusMatch::AllTokens(value.into())
    }

    pub fn any_token(value: impl Into<String>) -> Self {
        StatusMatch::AnyToken(value.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Ok(StatusMatch::Pattern(Regex::new(pattern)?))
    }

    pub fn json_pointer(pointer: impl Into<String>, expected: Value) -> Self {
        StatusMatch::JsonPointer {
            pointer: pointer.into(),
            expected,
        }
    }

    /// Compare raw query output. Only `JsonPointer` can fail, on output that
    /// is not JSON.
    pub fn matches(&self, output: &str) -> Result<bool, ClusterError> {
        let output = output.trim();
        Ok(match self {
            StatusMatch::Exact(value) => output == value,
            StatusMatch::AllTokens(value) => {
                let mut tokens = output.split_whitespace().peekable();
                tokens.peek().is_some() && tokens.all(|t| t == value)
            }
            StatusMatch::AnyToken(value) => output.split_whitespace().any(|t| t == value),
            StatusMatch::Pattern(regex) => regex.is_match(output),
            StatusMatch::JsonPointer { pointer, expected } => {
                let document: Value = serde_json::from_str(output).map_err(|e| {
                    ClusterError::MalformedObservation(format!(
                        "expected JSON for pointer {pointer}: {e}"
                    ))
                })?;
                document.pointer(pointer) == Some(expected)
            }
        })
    }
}

/// What a wait is waiting for.
#[derive(Debug, Clone)]
pub enum Expect {
    /// Any non-empty output.
    Present,
    /// Output matching a status.
    Status(StatusMatch),
}

impl Expect {
    /// Evaluate an observation. Absent and failed observations never satisfy.
    pub fn evaluate(&self, observation: &Observation<String>) -> Result<bool, ClusterError> {
        let Some(output) = observation.present() else {
            return Ok(false);
        };

        match self {
            Expect::Present => Ok(true),
            Expect::Status(status) => status.matches(output),
        }
    }
}

impl From<StatusMatch> for Expect {
    fn from(status: StatusMatch) -> Self {
        Expect::Status(status)
    }
}
