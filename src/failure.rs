//! Error Template Module
//!
//! Single path every repository, pagination, marshal and notification failure
//! goes through. Each report:
//! 1. generates a fresh trace id `<PREFIX>_<uuid>`
//! 2. logs the failure at error level with the trace id and caller fields
//! 3. tags the span with the trace id, records the error and marks the span errored
//! 4. derives the status label `<category>_<method>`
//! 5. hands back the zero value of the expected result with the caller's
//!    pre-classified domain error
//!
//! The status is returned inside [`Failure`] rather than written through an
//! out-parameter; [`Session::fail`] applies it to the running session.

use std::error::Error as StdError;
use std::fmt;

use tracing::error;
use uuid::Uuid;

use crate::observability::{Field, Fields, Session, Span, SpanStatus};

// == Error Category ==
/// Kind of failure being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The storage layer failed
    Repository,
    /// The storage layer failed on a paginated read; no count is available
    Pagination,
    /// A payload could not be serialized
    Marshal,
    /// A downstream side effect (e.g. publishing a message) failed
    Notification,
}

impl ErrorCategory {
    /// Prefix of the log message and span status.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCategory::Repository => "Repository error",
            ErrorCategory::Pagination => "Pagination error",
            ErrorCategory::Marshal => "Marshal error",
            ErrorCategory::Notification => "Notification error",
        }
    }

    /// Prefix of the status label.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Repository => "repository_error",
            ErrorCategory::Pagination => "pagination_error",
            ErrorCategory::Marshal => "marshal_error",
            ErrorCategory::Notification => "notification_error",
        }
    }

    /// Status label of a failure of this category in `method`.
    pub fn status_for(&self, method: &str) -> String {
        format!("{}_{}", self.label(), method)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Generates a correlation id such as `FAILED_FIND_SALDO_3f2a...`.
pub fn generate_trace_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}

// == Error Context ==
/// Where a failure happened: operation, trace id prefix, open span and the
/// fields to log alongside.
#[derive(Clone, Copy)]
pub struct ErrorContext<'a> {
    pub method: &'a str,
    pub trace_prefix: &'a str,
    pub span: &'a dyn Span,
    pub fields: &'a [Field],
}

impl<'a> ErrorContext<'a> {
    pub fn new(method: &'a str, trace_prefix: &'a str, span: &'a dyn Span, fields: &'a [Field]) -> Self {
        Self {
            method,
            trace_prefix,
            span,
            fields,
        }
    }
}

// == Failure ==
/// Outcome of a reported failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure<T, E> {
    /// Zero value of the expected result
    pub value: T,
    /// Domain error supplied by the caller, untouched
    pub error: E,
    /// Status label for the session metrics
    pub status: String,
    /// Correlation id written to the log line and the span
    pub trace_id: String,
}

impl<T, E> Failure<T, E> {
    /// Drops status tracking and returns the result pair.
    pub fn into_parts(self) -> (T, E) {
        (self.value, self.error)
    }
}

impl Session {
    /// Context for reporting a failure of this session.
    pub fn error_context<'a>(&'a self, trace_prefix: &'a str, fields: &'a [Field]) -> ErrorContext<'a> {
        ErrorContext::new(self.method(), trace_prefix, self.span(), fields)
    }

    /// Applies the failure status to the session and returns the result pair.
    pub fn fail<T, E>(&mut self, failure: Failure<T, E>) -> (T, E) {
        self.set_status(failure.status);
        (failure.value, failure.error)
    }
}

// == Core ==
/// Reports `error` under `category`. All specializations funnel through here.
pub fn report<T, E>(
    category: ErrorCategory,
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    value: T,
    domain_error: E,
) -> Failure<T, E> {
    let trace_id = generate_trace_id(ctx.trace_prefix);
    let message = format!("{} in {}", category.message(), ctx.method);

    error!(
        method = ctx.method,
        trace_id = %trace_id,
        error = %error,
        fields = %Fields(ctx.fields),
        "{message}"
    );

    ctx.span.set_attributes(&[Field::new("trace.id", &trace_id)]);
    ctx.span.record_error(error);
    ctx.span.set_status(SpanStatus::Error(message));

    Failure {
        value,
        error: domain_error,
        status: category.status_for(ctx.method),
        trace_id,
    }
}

// == Specializations ==
/// Repository failure of an operation returning a single value.
pub fn handle_repository_error<T: Default, E>(
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    domain_error: E,
) -> Failure<T, E> {
    report(ErrorCategory::Repository, ctx, error, T::default(), domain_error)
}

/// Repository failure of an operation returning a list.
pub fn handle_repository_list_error<T, E>(
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    domain_error: E,
) -> Failure<Vec<T>, E> {
    report(ErrorCategory::Repository, ctx, error, Vec::new(), domain_error)
}

/// Repository failure of a paginated read. The total count is always `None`.
pub fn handle_repository_pagination_error<T: Default, E>(
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    domain_error: E,
) -> Failure<(T, Option<i64>), E> {
    report(
        ErrorCategory::Pagination,
        ctx,
        error,
        (T::default(), None),
        domain_error,
    )
}

/// Serialization failure.
pub fn handle_marshal_error<T: Default, E>(
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    domain_error: E,
) -> Failure<T, E> {
    report(ErrorCategory::Marshal, ctx, error, T::default(), domain_error)
}

/// Failure of a downstream side effect such as publishing a message.
pub fn handle_notification_error<T: Default, E>(
    ctx: &ErrorContext<'_>,
    error: &dyn StdError,
    domain_error: E,
) -> Failure<T, E> {
    report(ErrorCategory::Notification, ctx, error, T::default(), domain_error)
}
