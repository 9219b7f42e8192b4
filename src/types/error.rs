use thiserror::Error;

use super::time_window::TimeWindowError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("context name must not be empty")]
    EmptyContextName,

    #[error("invalid expression '{expression}' in extension '{extension}' of context '{context}'")]
    InvalidExpression {
        context: String,
        extension: String,
        expression: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid time window in extension '{extension}' of context '{context}': {source}")]
    InvalidTimeWindow {
        context: String,
        extension: String,
        #[source]
        source: TimeWindowError,
    },

    #[error("action without application in extension '{extension}' of context '{context}'")]
    EmptyApplication { context: String, extension: String },
}

/// Configuration problems found while walking. They abort the enclosing
/// extension only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("nested conditions are not allowed (extension '{extension}' of context '{context}')")]
    NestedCondition { context: String, extension: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_message() {
        assert_eq!(
            CompileError::EmptyContextName.to_string(),
            "context name must not be empty"
        );
    }

    #[test]
    fn invalid_expression_message() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = CompileError::InvalidExpression {
            context: "default".into(),
            extension: "echo".into(),
            expression: "(".into(),
            source,
        };
        assert_eq!(
            err.to_string(),
            "invalid expression '(' in extension 'echo' of context 'default'"
        );
    }

    #[test]
    fn invalid_time_window_message() {
        let err = CompileError::InvalidTimeWindow {
            context: "default".into(),
            extension: "hours".into(),
            source: TimeWindowError::UnknownAttribute("fortnight".into()),
        };
        assert_eq!(
            err.to_string(),
            "invalid time window in extension 'hours' of context 'default': unknown time attribute 'fortnight'"
        );
    }

    #[test]
    fn empty_application_message() {
        let err = CompileError::EmptyApplication {
            context: "default".into(),
            extension: "x".into(),
        };
        assert_eq!(
            err.to_string(),
            "action without application in extension 'x' of context 'default'"
        );
    }

    #[test]
    fn nested_condition_message() {
        let err = ConfigError::NestedCondition {
            context: "default".into(),
            extension: "bad".into(),
        };
        assert_eq!(
            err.to_string(),
            "nested conditions are not allowed (extension 'bad' of context 'default')"
        );
    }
}
