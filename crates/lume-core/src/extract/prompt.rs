//! Prompt construction for structured extraction

use std::fmt::Write;

use chrono::{DateTime, Local};
use serde_json::Value;

use crate::models::{Parameters, Service};

/// Parameters the automation backend understands for each action
pub fn action_parameters(action: &str) -> &'static [&'static str] {
    match action {
        "send_email" | "create_draft" => &["to", "cc", "bcc", "subject", "body", "attachments"],
        "read_emails" => &["query", "sender", "subject", "date_range", "unread_only"],
        "reply_email" => &["message_id", "body", "reply_all"],
        "forward_email" => &["message_id", "to", "body"],
        "delete_email" | "mark_read" | "mark_unread" => &["message_id"],
        "create_event" => &[
            "title",
            "start_time",
            "end_time",
            "description",
            "location",
            "attendees",
            "reminder",
        ],
        "list_events" => &["date_range", "calendar_id", "query"],
        "update_event" => &[
            "event_id",
            "title",
            "start_time",
            "end_time",
            "description",
            "location",
            "attendees",
        ],
        "delete_event" | "get_event" => &["event_id"],
        "find_free_time" => &["duration", "date_range", "attendees"],
        "create_task" => &["title", "description", "due_date", "priority", "task_list_id"],
        "list_tasks" => &["task_list_id", "completed", "due_date_range"],
        "update_task" => &["task_id", "title", "description", "due_date", "priority"],
        "delete_task" | "complete_task" => &["task_id"],
        "create_task_list" => &["title"],
        "create_note" => &["title", "content", "labels", "color"],
        "list_notes" => &["query", "labels", "archived"],
        "update_note" => &["note_id", "title", "content", "labels"],
        "delete_note" => &["note_id"],
        "search_notes" => &["query", "labels"],
        "create_list" => &["title", "items", "labels"],
        _ => &[],
    }
}

const PREAMBLE: &str = "You are an assistant that converts natural language requests into structured JSON \
for productivity service automation.

## TASK
Classify the request into exactly one service and one action, and extract the action's parameters. \
Return ONLY a raw JSON object with no markdown formatting, explanations, or additional text.
";

const SCHEMA: &str = r#"
## OUTPUT SCHEMA
Return ONLY a JSON object with these exact keys:
{
    "service": "mail|calendar|tasks|notes|unknown",
    "action": "specific_action_name",
    "parameters": {
        "key": "value"
    },
    "confidence": 0.0-1.0
}
"#;

const FEW_SHOT: &str = r#"
## EXAMPLES

User: "Send an email to john@company.com about the meeting tomorrow"
Output:
{"service": "mail", "action": "send_email", "parameters": {"to": "john@company.com", "subject": "Meeting Tomorrow", "body": "Hi John, following up about our meeting tomorrow."}, "confidence": 0.9}

User: "Schedule a team standup for Monday at 9 AM for 30 minutes"
Output:
{"service": "calendar", "action": "create_event", "parameters": {"title": "Team Standup", "start_time": "Monday 9:00 AM", "end_time": "Monday 9:30 AM"}, "confidence": 0.95}

User: "Add buy groceries to my todo list for this weekend"
Output:
{"service": "tasks", "action": "create_task", "parameters": {"title": "Buy groceries", "due_date": "this weekend"}, "confidence": 0.9}

User: "Create a note with my meeting notes from today"
Output:
{"service": "notes", "action": "create_note", "parameters": {"title": "Meeting Notes", "content": "Notes from today's meeting", "labels": ["meeting", "work"]}, "confidence": 0.85}

User: "What's the weather like?"
Output:
{"service": "unknown", "action": "unsupported_request", "parameters": {"original_request": "What's the weather like?"}, "confidence": 0.1}
"#;

const INSTRUCTIONS: &str = "
## CRITICAL INSTRUCTIONS
1. Return ONLY the JSON object, no other text.
2. Use only the services and actions listed above.
3. Use \"unknown\" when the request matches no service.
4. Resolve relative dates against the current date and time below.
5. Lower the confidence when the request is ambiguous.
";

/// The fixed system instructions
pub fn system_prompt() -> String {
    let mut prompt = String::from(PREAMBLE);
    prompt.push_str("\n## SUPPORTED SERVICES & ACTIONS\n");

    for (i, service) in Service::ALL.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "\n### {}. {} ({})",
            i + 1,
            service.as_str().to_uppercase(),
            service.display_name()
        );
        for action in service.actions() {
            let params = action_parameters(action);
            if params.is_empty() {
                let _ = writeln!(prompt, "- {}", action);
            } else {
                let _ = writeln!(prompt, "- {}: {}", action, params.join(", "));
            }
        }
    }

    prompt.push_str(SCHEMA);
    prompt.push_str(FEW_SHOT);
    prompt.push_str(INSTRUCTIONS);
    prompt
}

/// Build the full prompt for a request at the current local time
pub fn build_prompt(text: &str, context: Option<&Parameters>) -> String {
    build_prompt_at(text, context, Local::now())
}

/// Build the full prompt for a request at a fixed time
pub fn build_prompt_at(text: &str, context: Option<&Parameters>, now: DateTime<Local>) -> String {
    let mut prompt = system_prompt();
    let _ = write!(
        prompt,
        "\nCurrent Date/Time: {}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    );

    if let Some(context) = context.filter(|c| !c.is_empty()) {
        let rendered = serde_json::to_string_pretty(&Value::Object(context.clone()))
            .unwrap_or_else(|_| "{}".to_string());
        let _ = write!(prompt, "\nUser Context: {}\n", rendered);
    }

    let _ = write!(
        prompt,
        "\nUser Request: \"{}\"\n\nRespond with JSON only:",
        text
    );
    prompt
}
