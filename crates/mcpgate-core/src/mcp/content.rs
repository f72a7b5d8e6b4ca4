//! Normalization of tool result content into plain text

use serde_json::Value;

/// Flatten provider content into the text shown to humans and to the model
///
/// An array of content blocks becomes newline-joined text, taking each
/// block's `text` field when present and its JSON rendering otherwise. A
/// bare string passes through; any other value is JSON-rendered.
pub fn normalize_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .map(render_block)
            .collect::<Vec<_>>()
            .join("\n"),
        other => other.to_string(),
    }
}

fn render_block(block: &Value) -> String {
    match block {
        Value::String(text) => text.clone(),
        _ => match block.get("text") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => block.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_blocks_are_joined() {
        let content = json!([
            { "type": "text", "text": "first" },
            { "type": "text", "text": "second" }
        ]);
        assert_eq!(normalize_content(&content), "first\nsecond");
    }

    #[test]
    fn test_non_text_blocks_fall_back_to_json() {
        let content = json!([
            { "type": "text", "text": "caption" },
            { "type": "image" }
        ]);
        assert_eq!(
            normalize_content(&content),
            "caption\n{\"type\":\"image\"}"
        );
    }

    #[test]
    fn test_strings_and_scalars() {
        assert_eq!(normalize_content(&json!("plain")), "plain");
        assert_eq!(normalize_content(&json!(42)), "42");
        assert_eq!(normalize_content(&json!({ "ok": true })), "{\"ok\":true}");
        assert_eq!(normalize_content(&json!([])), "");
    }
}
