use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message_source::MessageSource;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CitationContext {
    pub sources: Vec<MessageSource>,
}

/// Structured grounding data stored on an assistant message.
///
/// Known citation payloads decode into [`RetrievalContext::Citations`]; anything else
/// written by older producers is kept verbatim in the generic map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievalContext {
    Citations(CitationContext),
    Generic(Map<String, Value>),
}

impl RetrievalContext {
    pub fn from_sources(sources: Vec<MessageSource>) -> Self {
        RetrievalContext::Citations(CitationContext { sources })
    }

    pub fn sources(&self) -> &[MessageSource] {
        match self {
            RetrievalContext::Citations(context) => &context.sources,
            RetrievalContext::Generic(_) => &[],
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn from_value(value: Value) -> Result<Self, String> {
        serde_json::from_value(value).map_err(|e| format!("Invalid retrieval context: {}", e))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolCall {
    Function(FunctionCall),
    Generic(Map<String, Value>),
}

impl ToolCall {
    pub fn name(&self) -> Option<&str> {
        match self {
            ToolCall::Function(call) => Some(&call.name),
            ToolCall::Generic(map) => map.get("name").and_then(Value::as_str),
        }
    }
}

pub fn tool_calls_to_value(calls: &[ToolCall]) -> Value {
    serde_json::to_value(calls).unwrap_or_else(|_| Value::Array(Vec::new()))
}

pub fn tool_calls_from_value(value: Value) -> Result<Vec<ToolCall>, String> {
    serde_json::from_value(value).map_err(|e| format!("Invalid tool calls: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_citation_payload_decodes_to_known_variant() {
        let value = json!({
            "sources": [{
                "document_id": "doc-1",
                "chunk_id": "doc-1-3",
                "score": 0.82,
                "title": "Handbook",
                "snippet": "EchoMind is..."
            }]
        });

        let context = RetrievalContext::from_value(value).unwrap();
        assert!(matches!(context, RetrievalContext::Citations(_)));
        assert_eq!(context.sources().len(), 1);
        assert_eq!(context.sources()[0].chunk_id, "doc-1-3");
    }

    #[test]
    fn test_unknown_payload_is_preserved_in_generic_map() {
        let value = json!({"sources": [], "reranker": "bm25"});

        let context = RetrievalContext::from_value(value.clone()).unwrap();
        assert!(matches!(context, RetrievalContext::Generic(_)));
        assert!(context.sources().is_empty());
        assert_eq!(context.to_value(), value);
    }

    #[test]
    fn test_tool_calls_keep_unknown_shapes() {
        let value = json!([
            {"id": "call_1", "name": "search", "arguments": {"q": "rust"}},
            {"type": "image", "name": "render", "url": "https://example.com/a.png"}
        ]);

        let calls = tool_calls_from_value(value.clone()).unwrap();
        assert!(matches!(calls[0], ToolCall::Function(_)));
        assert!(matches!(calls[1], ToolCall::Generic(_)));
        assert_eq!(calls[1].name(), Some("render"));
        assert_eq!(tool_calls_to_value(&calls), value);
    }
}
