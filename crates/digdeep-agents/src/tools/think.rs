//! Think Tool - explicit reflection during research
//!
//! Has no side effects: the reflection is echoed back so the reasoning
//! becomes a visible, traceable turn in the conversation.

use tracing::debug;

/// Records strategic notes between research steps
#[derive(Debug, Clone, Copy, Default)]
pub struct ReflectionTool;

impl ReflectionTool {
    /// Record a reflection and return the confirmation text
    pub fn record(&self, reflection: &str) -> String {
        debug!(reflection_len = reflection.len(), "Reflection recorded");
        format!("Reflection recorded: {}", reflection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reflection_echoes_text() {
        let tool = ReflectionTool;
        assert_eq!(
            tool.record("Found 3 sources, need pricing data"),
            "Reflection recorded: Found 3 sources, need pricing data"
        );
    }

    #[test]
    fn test_reflection_empty_text() {
        assert_eq!(ReflectionTool.record(""), "Reflection recorded: ");
    }
}
