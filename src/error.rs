use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Programmer and configuration errors. Validation outcomes are [`Failure`]s.
#[derive(Error, Debug)]
pub enum RescoreError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Unknown type: {0}")]
    UnknownType(String),
    #[error("Invalid type reference: {0}")]
    InvalidTypeRef(String),
    #[error("Invalid constraint {name}: {message}")]
    InvalidConstraint { name: String, message: String },
    #[error("Type already registered: {0}")]
    DuplicateType(String),
}

pub type Result<T> = std::result::Result<T, RescoreError>;

impl From<config::ConfigError> for RescoreError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

impl RescoreError {
    pub(crate) fn constraint(name: &str, message: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            name: name.to_owned(),
            message: message.into(),
        }
    }
}

/// A structured validation message: a template with `%{name}` placeholders
/// and the ordered variables to interpolate into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reason {
    message: String,
    vars: Vec<(String, Value)>,
}

impl Reason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            vars: Vec::new(),
        }
    }
    pub fn invalid() -> Self {
        Self::new("is invalid")
    }
    /// Sets a variable, replacing any previous value under the same name.
    pub fn with_var(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        match self.vars.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.vars.push((name.to_owned(), value)),
        }
        self
    }
    pub fn at_index(self, index: usize) -> Self {
        self.with_var("index", index)
    }
    pub fn message(&self) -> &str {
        &self.message
    }
    pub fn vars(&self) -> &[(String, Value)] {
        &self.vars
    }
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
    pub fn index(&self) -> Option<usize> {
        self.var("index")
            .and_then(Value::as_i64)
            .and_then(|i| usize::try_from(i).ok())
    }
    /// The message with every known `%{name}` replaced by its variable.
    pub fn render(&self) -> String {
        let mut rendered = self.message.clone();
        for (name, value) in &self.vars {
            rendered = rendered.replace(&format!("%{{{}}}", name), &value.to_string());
        }
        rendered
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index() {
            Some(i) => write!(f, "{} (at index {})", self.render(), i),
            None => write!(f, "{}", self.render()),
        }
    }
}

/// Result of a failed cast, dump or constraint check.
///
/// `Invalid` is the bare signal with no explanation. `Many` may nest; use
/// [`Failure::flatten`] to get the ordered leaf reasons.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Failure {
    #[error("is invalid")]
    Invalid,
    #[error("{0}")]
    Reason(Reason),
    #[error("{}", render_all(.0))]
    Many(Vec<Failure>),
}

fn render_all(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl Failure {
    pub fn reason(message: impl Into<String>) -> Self {
        Self::Reason(Reason::new(message))
    }

    /// Collapses a list of reasons, keeping a lone reason unwrapped.
    pub fn from_reasons(mut reasons: Vec<Reason>) -> Self {
        match reasons.len() {
            0 => Self::Invalid,
            1 => Self::Reason(reasons.remove(0)),
            _ => Self::Many(reasons.into_iter().map(Self::Reason).collect()),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid)
    }

    /// Depth-first leaf reasons in order. A bare `Invalid` becomes "is invalid".
    pub fn flatten(self) -> Vec<Reason> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(self, out: &mut Vec<Reason>) {
        match self {
            Self::Invalid => out.push(Reason::invalid()),
            Self::Reason(r) => out.push(r),
            Self::Many(failures) => {
                for failure in failures {
                    failure.flatten_into(out);
                }
            }
        }
    }

    /// Flattens and tags every leaf with the element index.
    pub fn at_index(self, index: usize) -> Self {
        Self::from_reasons(self.flatten().into_iter().map(|r| r.at_index(index)).collect())
    }

    /// Flattened reasons without consuming the failure.
    pub fn reasons(&self) -> Vec<Reason> {
        self.clone().flatten()
    }
}

impl From<Reason> for Failure {
    fn from(r: Reason) -> Self {
        Self::Reason(r)
    }
}
