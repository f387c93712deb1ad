use serde::{Deserialize, Serialize};

/// Where an error happened, for the log line that accompanies the toast.
/// The endpoint is not repeated here: API errors already name it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub operation: Option<String>,
    pub resource_id: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_operation(operation: impl Into<String>) -> Self {
        Self::new().with_operation(operation)
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let context = ErrorContext::for_operation("delete patients").with_resource_id("P-1");
        assert_eq!(context.operation.as_deref(), Some("delete patients"));
        assert_eq!(context.resource_id.as_deref(), Some("P-1"));
        assert_eq!(ErrorContext::new(), ErrorContext::default());
    }
}
