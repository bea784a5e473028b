//! Error types for detection analysis.
//!
//! Every report validates its parameters before any aggregation starts, so
//! each error carries enough context to tell which report and which
//! selection failed.

use std::fmt;

/// Result type for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Structured context for analysis errors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorContext {
    /// The operation being performed (e.g., "build_grid", "compare")
    pub operation: Option<String>,
    /// The annotator/label selection involved, rendered as `annotator/label`
    pub selection: Option<String>,
    /// Additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with an operation name.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: Some(operation.into()),
            ..Default::default()
        }
    }

    /// Set the selection.
    pub fn with_selection(mut self, annotator: &str, label: &str) -> Self {
        self.selection = Some(format!("{}/{}", annotator, label));
        self
    }

    /// Set additional details.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    fn is_empty(&self) -> bool {
        self.operation.is_none() && self.selection.is_none() && self.details.is_none()
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }
        let mut parts = Vec::new();
        if let Some(ref op) = self.operation {
            parts.push(format!("operation={}", op));
        }
        if let Some(ref selection) = self.selection {
            parts.push(format!("selection={}", selection));
        }
        if let Some(ref details) = self.details {
            parts.push(format!("details={}", details));
        }
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Error type for analysis operations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    /// A parameter is outside its allowed domain (resolution, date range,
    /// location field, overlay shape).
    #[error("Invalid parameter: {message} {context}")]
    InvalidParameter {
        message: String,
        context: ErrorContext,
    },

    /// Two detection streams that must share a timebin do not.
    #[error("Timebin mismatch: {message} {context}")]
    TimebinMismatch {
        message: String,
        context: ErrorContext,
    },

    /// The detection table cannot support the requested report.
    #[error("Insufficient data: {message} {context}")]
    InsufficientData {
        message: String,
        context: ErrorContext,
    },

    /// A bin holds more detections than its theoretical capacity and the
    /// active overflow policy rejects it.
    #[error("Capacity exceeded: {message} {context}")]
    CapacityExceeded {
        message: String,
        context: ErrorContext,
    },

    /// Report configuration could not be read or parsed.
    #[error("Configuration error: {message} {context}")]
    Configuration {
        message: String,
        context: ErrorContext,
    },
}

impl AnalysisError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a timebin mismatch error.
    pub fn timebin_mismatch(message: impl Into<String>) -> Self {
        Self::TimebinMismatch {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            context: ErrorContext::default(),
        }
    }

    /// Get the error context.
    pub fn context(&self) -> &ErrorContext {
        match self {
            Self::InvalidParameter { context, .. }
            | Self::TimebinMismatch { context, .. }
            | Self::InsufficientData { context, .. }
            | Self::CapacityExceeded { context, .. }
            | Self::Configuration { context, .. } => context,
        }
    }

    fn context_mut(&mut self) -> &mut ErrorContext {
        match self {
            Self::InvalidParameter { context, .. }
            | Self::TimebinMismatch { context, .. }
            | Self::InsufficientData { context, .. }
            | Self::CapacityExceeded { context, .. }
            | Self::Configuration { context, .. } => context,
        }
    }

    /// Add or update the operation in the error context.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.context_mut().operation = Some(operation.into());
        self
    }

    /// Add or update the selection in the error context.
    pub fn with_selection(mut self, annotator: &str, label: &str) -> Self {
        self.context_mut().selection = Some(format!("{}/{}", annotator, label));
        self
    }

    /// Add or update the details in the error context.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.context_mut().details = Some(details.into());
        self
    }

    /// Stable code for programmatic handling by callers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "INVALID_PARAMETER",
            Self::TimebinMismatch { .. } => "TIMEBIN_MISMATCH",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            Self::Configuration { .. } => "CONFIGURATION",
        }
    }
}
