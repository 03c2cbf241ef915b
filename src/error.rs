//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Errors raised while configuring or attaching instrumentation.
///
/// Nothing in here is ever routed through a [`LogSink`](crate::LogSink):
/// these fail before a tag exists to log under.
#[derive(Error, Debug)]
pub enum DebugError {
    #[error("Call stack too shallow: frame {depth} requested but only {available} captured (optimized or obfuscated build?)")]
    StackTooShallow { depth: usize, available: usize },

    #[error("Config error: {reason}")]
    Config { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DebugError>;

impl FixSuggestion for DebugError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DebugError::StackTooShallow { .. } => Some(
                "Lower frame_depth_with_tag / frame_depth_without_tag, or pass a tag explicitly",
            ),
            DebugError::Config { .. } => Some("Check the stream-debug config values"),
            DebugError::Io(_) => Some("Check file path and permissions"),
            DebugError::Yaml(_) => Some("Check YAML syntax: indentation and quoting"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_too_shallow_message_names_depths() {
        let err = DebugError::StackTooShallow {
            depth: 2,
            available: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("frame 2"));
        assert!(msg.contains("only 1"));
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let errors = [
            DebugError::StackTooShallow {
                depth: 0,
                available: 0,
            },
            DebugError::Config {
                reason: "bad".into(),
            },
            DebugError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
        ];
        for err in &errors {
            assert!(err.fix_suggestion().is_some(), "no suggestion for {err}");
        }
    }
}
