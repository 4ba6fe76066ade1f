use crate::transport::TransportError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or configuration key that caused the error (e.g., "api_key", "providers.xtts.serverUrl")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected values, offending input)
    pub details: Option<String>,
    /// Source of the error (e.g., "registry", "elevenlabs", "config")
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

/// Unified error type for saym.
///
/// `Configuration` is raised before any network activity (missing credentials,
/// unknown provider type, invalid local input). `Provider` covers every vendor or
/// transport failure observed during a provider operation. `Unsupported` is kept
/// apart so callers can say "not supported by this provider" instead of "failed".
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("[{provider}] {message}")]
    Provider { provider: String, message: String },

    #[error("[{provider}] {capability} is not supported by this provider")]
    Unsupported {
        provider: String,
        capability: String,
    },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration {
            message: msg.into(),
            context: ErrorContext::new(),
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn provider(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: msg.into(),
        }
    }

    pub fn unsupported(provider: impl Into<String>, capability: impl Into<String>) -> Self {
        Error::Unsupported {
            provider: provider.into(),
            capability: capability.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Error::Playback {
            message: msg.into(),
        }
    }

    /// A missing mandatory credential for `provider`.
    pub(crate) fn missing_credential(provider: &str, field: &str, hint: &str) -> Self {
        Error::configuration_with_context(
            hint.to_string(),
            ErrorContext::new()
                .with_field_path(field)
                .with_source(provider),
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Unsupported { .. })
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, Error::Provider { .. })
    }

    /// Vendor name carried by provider-scoped errors.
    pub fn provider_name(&self) -> Option<&str> {
        match self {
            Error::Provider { provider, .. } | Error::Unsupported { provider, .. } => {
                Some(provider)
            }
            Error::Configuration { context, .. } => context.source.as_deref(),
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
