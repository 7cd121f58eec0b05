//! Span definitions per operation: anonymize, deanonymize, batch, resolve.

/// Create an anonymize span.
#[macro_export]
macro_rules! anonymize_span {
    ($scope:expr, $text_len:expr) => {
        tracing::info_span!("veil.anonymize", scope = %$scope, text_len = $text_len)
    };
}

/// Create a deanonymize span.
#[macro_export]
macro_rules! deanonymize_span {
    ($scope:expr, $text_len:expr) => {
        tracing::info_span!("veil.deanonymize", scope = %$scope, text_len = $text_len)
    };
}

/// Create a batch span.
#[macro_export]
macro_rules! batch_span {
    ($scope:expr, $items:expr) => {
        tracing::info_span!("veil.batch", scope = %$scope, items = $items)
    };
}

/// Create a forward-resolution span.
#[macro_export]
macro_rules! resolve_span {
    ($scope:expr, $category:expr) => {
        tracing::debug_span!("veil.resolve", scope = %$scope, category = %$category)
    };
}

/// Span names as constants for programmatic use.
pub mod names {
    pub const ANONYMIZE: &str = "veil.anonymize";
    pub const DEANONYMIZE: &str = "veil.deanonymize";
    pub const BATCH: &str = "veil.batch";
    pub const RESOLVE: &str = "veil.resolve";
}
