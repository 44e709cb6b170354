use serde_json::json;
use toolchat::llm::types::{ContentBlock, Message, ToolUse};

#[test]
fn serializes_user_message_with_text_content() {
    let msg = Message::user("hi");
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(value, json!({ "role": "user", "content": "hi" }));
}

#[test]
fn serializes_assistant_message_with_text_content() {
    let msg = Message::assistant("ok");
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(value, json!({ "role": "assistant", "content": "ok" }));
}

#[test]
fn serializes_tool_result_message_as_blocks() {
    let msg = Message::tool_result("toolu_123".to_string(), "output".to_string(), None);
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(
        value,
        json!({
            "role": "user",
            "content": [
                { "type": "tool_result", "tool_use_id": "toolu_123", "content": "output" }
            ]
        })
    );
}

#[test]
fn serializes_tool_result_message_with_is_error() {
    let msg = Message::tool_result("toolu_123".to_string(), "output".to_string(), Some(true));
    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(
        value,
        json!({
            "role": "user",
            "content": [
                { "type": "tool_result", "tool_use_id": "toolu_123", "content": "output", "is_error": true }
            ]
        })
    );
}

#[test]
fn serializes_assistant_blocks_with_tool_use() {
    let tool_use = ToolUse {
        id: "toolu_abc".to_string(),
        name: "search".to_string(),
        input: json!({ "query": "trending" }),
    };

    let msg = Message::assistant_with_blocks(vec![
        ContentBlock::Text {
            text: "Looking that up".to_string(),
        },
        ContentBlock::ToolUse(tool_use),
    ]);

    let value = serde_json::to_value(msg).unwrap();
    assert_eq!(
        value,
        json!({
            "role": "assistant",
            "content": [
                { "type": "text", "text": "Looking that up" },
                { "type": "tool_use", "id": "toolu_abc", "name": "search", "input": { "query": "trending" } }
            ]
        })
    );
}

#[test]
fn deserializes_tool_use_with_missing_input() {
    let tool_use: ToolUse =
        serde_json::from_value(json!({ "id": "toolu_1", "name": "search" })).unwrap();
    assert_eq!(tool_use.name, "search");
    assert!(tool_use.input.is_null());
}
