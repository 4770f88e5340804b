use crate::document::TaskInput;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Raw response returned by a capability handler before parsing.
///
/// `payload` is the structured part the runner validates into an
/// [`AgentReport`](crate::report::AgentReport); `raw_output` is kept verbatim
/// so malformed payloads remain inspectable.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub payload: serde_json::Value,
    pub raw_output: String,
    pub tokens_used: u64,
}

impl AgentResponse {
    pub fn new(payload: serde_json::Value, tokens_used: u64) -> Self {
        let raw_output = payload.to_string();
        Self {
            payload,
            raw_output,
            tokens_used,
        }
    }
}

/// Network-bound analysis capability, e.g. one reviewer persona backed by an
/// LLM call. Implementations are injected at the edge; the core never
/// constructs handlers itself.
///
/// `execute` is given a single document section and returns the agent's raw
/// response. Errors are reported through the returned `Result`; handlers
/// should not panic, but the runner tolerates panics and converts them into
/// task failures.
#[async_trait]
pub trait CapabilityHandler: Send + Sync {
    /// Stable capability name tasks refer to, e.g. "methodology_review"
    fn name(&self) -> &str;

    async fn execute(&self, input: &TaskInput) -> anyhow::Result<AgentResponse>;
}

/// Registry mapping capability names to their handlers. Cloning is cheap;
/// handlers themselves are shared.
#[derive(Default, Clone)]
pub struct CapabilityRegistry {
    handlers: HashMap<String, Arc<dyn CapabilityHandler>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own name. Re-registering a name replaces
    /// the previous handler.
    pub fn register(&mut self, handler: Arc<dyn CapabilityHandler>) {
        self.handlers.insert(handler.name().to_string(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CapabilityHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("capabilities", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMeta, DocumentSection};

    struct MockReviewer {
        name: String,
    }

    #[async_trait]
    impl CapabilityHandler for MockReviewer {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self, _input: &TaskInput) -> anyhow::Result<AgentResponse> {
            Ok(AgentResponse::new(
                serde_json::json!({ "summary": "ok", "findings": [] }),
                10,
            ))
        }
    }

    #[test]
    fn test_register_and_get() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(MockReviewer {
            name: "methodology_review".to_string(),
        }));
        registry.register(Arc::new(MockReviewer {
            name: "novelty_review".to_string(),
        }));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("methodology_review"));
        assert!(!registry.contains("rigor_review"));
        assert_eq!(
            registry.names(),
            vec!["methodology_review", "novelty_review"]
        );
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = CapabilityRegistry::new();
        registry.register(Arc::new(MockReviewer {
            name: "novelty_review".to_string(),
        }));
        registry.register(Arc::new(MockReviewer {
            name: "novelty_review".to_string(),
        }));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_handler_execute() {
        let handler = MockReviewer {
            name: "methodology_review".to_string(),
        };
        let input = TaskInput::new(
            DocumentMeta::new("Paper", vec!["A. Author".to_string()], 2023),
            DocumentSection::new("methods", "We trained a model.", 2),
        );
        let response = handler.execute(&input).await.unwrap();
        assert_eq!(response.tokens_used, 10);
        assert!(response.raw_output.contains("summary"));
    }
}
