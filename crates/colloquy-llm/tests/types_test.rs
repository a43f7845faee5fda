use colloquy_llm::{Content, Message, Tool, ToolCall, ToolChoice};
use serde_json::json;

#[test]
fn test_content_from_string() {
    let content: Content = "Test".into();
    assert_eq!(content.as_text(), Some("Test"));
    assert!(!content.has_image());
}

#[test]
fn test_content_with_image_is_not_plain_text() {
    let content = Content::text_with_image("describe", "https://example.com/cat.png");
    assert_eq!(content.as_text(), None);
    assert!(content.has_image());
}

#[test]
fn test_message_roles() {
    assert_eq!(Message::system("You are helpful").role(), "system");
    assert_eq!(Message::developer("Formatting re-enabled").role(), "developer");
    assert_eq!(Message::human("Hello").role(), "user");
    assert_eq!(Message::ai("Hi there!").role(), "assistant");
    assert_eq!(Message::tool_result("call_123", "42").role(), "tool");
}

#[test]
fn test_message_text() {
    assert_eq!(Message::ai("Hi there!").text(), Some("Hi there!"));
    assert_eq!(Message::ai_with_tools(Vec::new()).text(), None);
    assert_eq!(Message::tool_result("call_1", "42").text(), Some("42"));
}

#[test]
fn test_message_serialization_human() {
    let msg = Message::human("Hello");
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"role\":\"user\""));
    assert!(json.contains("Hello"));
}

#[test]
fn test_message_serialization_developer() {
    let json = serde_json::to_value(Message::developer("rules")).unwrap();
    assert_eq!(json["role"], "developer");
    assert_eq!(json["content"], "rules");
}

#[test]
fn test_message_deserialization() {
    let json = r#"{"role":"user","content":"Test"}"#;
    let msg: Message = serde_json::from_str(json).unwrap();
    assert_eq!(msg.role(), "user");
}

#[test]
fn test_tool_creation() {
    let tool = Tool::new(
        "get_weather",
        "Get weather for location",
        json!({
            "type": "object",
            "properties": {
                "location": {"type": "string"}
            }
        }),
    );

    assert_eq!(tool.name(), "get_weather");
    assert_eq!(tool.tool_type, "function");
    assert!(tool.function.description.is_some());
}

#[test]
fn test_tool_call_parse_arguments() {
    #[derive(serde::Deserialize)]
    struct Args {
        city: String,
    }

    let call = ToolCall::function("call_1", "get_weather", r#"{"city":"Lisbon"}"#);
    let args: Args = call.parse_arguments().unwrap();
    assert_eq!(args.city, "Lisbon");
}

#[test]
fn test_tool_choice_wire_format() {
    assert_eq!(ToolChoice::auto().to_value(), json!("auto"));
    assert_eq!(
        ToolChoice::force("lookup").to_value(),
        json!({"type": "function", "function": {"name": "lookup"}})
    );
}
