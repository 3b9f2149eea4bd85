//! Completion outcomes shared by futures, transports and resources.

use std::fmt;

use thiserror::Error;

/// Outcome carried by every future completion.
pub type Result<T> = std::result::Result<T, Cause>;

/// Broad category of a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CauseKind {
    /// The fetch itself failed (connection, status, I/O).
    Transport,
    /// The fetch succeeded but produced no payload.
    NoData,
    /// The payload did not have the expected shape.
    Parse,
    /// A composed transform rejected its input.
    Transform,
    Other,
}

impl CauseKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CauseKind::Transport => "transport",
            CauseKind::NoData => "no data",
            CauseKind::Parse => "parse",
            CauseKind::Transform => "transform",
            CauseKind::Other => "other",
        }
    }
}

impl fmt::Display for CauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure description delivered through a future chain.
///
/// Unlike `anyhow::Error` a cause is cheap to clone, which lets a completed
/// future hand the same failure to every registered callback.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{kind} error: {message}")]
pub struct Cause {
    kind: CauseKind,
    message: String,
}

impl Cause {
    pub fn new(kind: CauseKind, message: impl Into<String>) -> Self {
        Cause {
            kind,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Cause::new(CauseKind::Transport, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Cause::new(CauseKind::Parse, message)
    }

    pub fn transform(message: impl Into<String>) -> Self {
        Cause::new(CauseKind::Transform, message)
    }

    /// Generic cause used when a producer reports failure without a reason.
    pub fn no_data() -> Self {
        Cause::new(CauseKind::NoData, "no data")
    }

    /// Capture an `anyhow` error, keeping its whole context chain.
    ///
    /// An error that already wraps a `Cause` is returned unchanged so that
    /// failures crossing a fallible closure keep their original kind.
    pub fn from_error(kind: CauseKind, err: &anyhow::Error) -> Self {
        match err.downcast_ref::<Cause>() {
            Some(cause) => cause.clone(),
            None => Cause::new(kind, format!("{err:#}")),
        }
    }

    pub fn kind(&self) -> CauseKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Turn an optional value into a result, failing with `else_cause` when absent.
pub fn wrap<T>(value: Option<T>, else_cause: Cause) -> Result<T> {
    match value {
        Some(value) => Ok(value),
        None => Err(else_cause),
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{Context, anyhow};

    use super::*;

    #[test]
    fn wrap_present_value_succeeds() {
        assert_eq!(wrap(Some(7), Cause::no_data()), Ok(7));
    }

    #[test]
    fn wrap_absent_value_uses_else_cause() {
        let outcome: Result<i32> = wrap(None, Cause::transport("connection refused"));
        let err = outcome.unwrap_err();
        assert_eq!(err.kind(), CauseKind::Transport);
        assert_eq!(err.message(), "connection refused");
    }

    #[test]
    fn map_leaves_error_untouched() {
        let failed: Result<i32> = Err(Cause::parse("bad shape"));
        let mut called = false;
        let mapped = failed.map(|v| {
            called = true;
            v + 1
        });
        assert!(!called);
        assert_eq!(mapped, Err(Cause::parse("bad shape")));
        assert_eq!(Ok::<_, Cause>(1).map(|v| v + 1), Ok(2));
    }

    #[test]
    fn display_prefixes_kind() {
        assert_eq!(Cause::no_data().to_string(), "no data error: no data");
        assert_eq!(
            Cause::parse("missing field `title`").to_string(),
            "parse error: missing field `title`"
        );
    }

    #[test]
    fn from_error_keeps_context_chain() {
        let err = Err::<(), _>(anyhow!("missing field `title`"))
            .context("decoding episode list")
            .unwrap_err();
        let cause = Cause::from_error(CauseKind::Parse, &err);
        assert_eq!(cause.kind(), CauseKind::Parse);
        assert_eq!(
            cause.message(),
            "decoding episode list: missing field `title`"
        );
    }

    #[test]
    fn from_error_preserves_wrapped_cause() {
        let err = anyhow::Error::new(Cause::transport("timed out upstream"));
        let cause = Cause::from_error(CauseKind::Transform, &err);
        assert_eq!(cause, Cause::transport("timed out upstream"));
    }
}
