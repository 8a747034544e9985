//! Productivity service identifiers and their action vocabulary

use serde::{Deserialize, Serialize};

/// One of the fixed productivity services the classifier distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Gmail and other mail
    Mail,
    /// Google Calendar events and scheduling
    Calendar,
    /// Google Tasks and to-do lists
    Tasks,
    /// Google Keep notes and memos
    Notes,
}

impl Service {
    /// Every service, in the fixed order used for output
    pub const ALL: [Service; 4] = [
        Service::Mail,
        Service::Calendar,
        Service::Tasks,
        Service::Notes,
    ];

    /// Canonical identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Mail => "mail",
            Service::Calendar => "calendar",
            Service::Tasks => "tasks",
            Service::Notes => "notes",
        }
    }

    /// Parse from string, accepting the vendor names generators tend to emit
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mail" | "email" | "gmail" => Some(Service::Mail),
            "calendar" => Some(Service::Calendar),
            "tasks" => Some(Service::Tasks),
            "notes" | "keep" => Some(Service::Notes),
            _ => None,
        }
    }

    /// Actions an automation backend accepts for this service
    pub fn actions(&self) -> &'static [&'static str] {
        match self {
            Service::Mail => &[
                "send_email",
                "read_emails",
                "reply_email",
                "forward_email",
                "delete_email",
                "mark_read",
                "mark_unread",
                "create_draft",
            ],
            Service::Calendar => &[
                "create_event",
                "list_events",
                "update_event",
                "delete_event",
                "get_event",
                "find_free_time",
            ],
            Service::Tasks => &[
                "create_task",
                "list_tasks",
                "update_task",
                "delete_task",
                "complete_task",
                "create_task_list",
            ],
            Service::Notes => &[
                "create_note",
                "list_notes",
                "update_note",
                "delete_note",
                "search_notes",
                "create_list",
            ],
        }
    }

    /// Check if an action belongs to this service's vocabulary
    pub fn supports_action(&self, action: &str) -> bool {
        self.actions().contains(&action)
    }

    /// Human-readable product name
    pub fn display_name(&self) -> &'static str {
        match self {
            Service::Mail => "Gmail",
            Service::Calendar => "Google Calendar",
            Service::Tasks => "Google Tasks",
            Service::Notes => "Google Keep",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
