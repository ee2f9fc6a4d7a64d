use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Configuration key or field that caused the error (e.g., "max_attempts", "RELAY_TIMEOUT_MS")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "relay_config", "relay_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Classified failure of a single execution attempt.
///
/// Every attempt that does not produce a payload ends in exactly one of these
/// classes. The retrying executor surfaces the last one it observed once the
/// attempt budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// The deadline elapsed before the upstream answered.
    #[error("attempt timed out after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// No response was obtained (connection refused, DNS, reset, ...).
    #[error("transport failure: {message}")]
    Transport { message: String },

    /// A response was obtained but it signaled failure.
    #[error("upstream responded with status {code}")]
    UpstreamStatus { code: u16, body: Option<String> },
}

impl Failure {
    pub fn transport(message: impl Into<String>) -> Self {
        Failure::Transport {
            message: message.into(),
        }
    }

    pub fn status(code: u16) -> Self {
        Failure::UpstreamStatus { code, body: None }
    }

    /// Short, stable label for logs and CLI output.
    pub fn kind(&self) -> &'static str {
        match self {
            Failure::Timeout { .. } => "timeout",
            Failure::Transport { .. } => "transport",
            Failure::UpstreamStatus { .. } => "upstream_status",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Failure::Timeout { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Failure::UpstreamStatus { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Unified error type for the relay.
///
/// Admission denial is its own variant and is never produced by an execution
/// attempt: a denied caller never reaches the executors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Admission denied for '{identity}': window resets in {}ms", .retry_after.as_millis())]
    Denied {
        identity: String,
        retry_after: Duration,
    },

    #[error("Upstream failure: {0}")]
    Upstream(#[from] Failure),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, Error::Denied { .. })
    }

    /// The classified execution failure, if this error came from an upstream call.
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Error::Upstream(f) => Some(f),
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }
}
