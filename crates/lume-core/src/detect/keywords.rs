//! Per-service keyword tables and clause matching

use std::collections::BTreeMap;

use regex::Regex;
use tracing::debug;

use crate::config::DetectorConfig;
use crate::error::{Error, Result};
use crate::models::Service;

const MAIL_KEYWORDS: &[&str] = &[
    // Core terms
    "email", "emails", "mail", "e-mail", "gmail",
    // Actions
    "send", "reply", "forward", "compose", "draft",
    // Message-related
    "message", "messages", "inbox", "outbox",
    // Phrases
    "send a message", "check email", "check mail", "reply to", "respond to",
];

const CALENDAR_KEYWORDS: &[&str] = &[
    "calendar", "event", "events", "meeting", "meetings", "appointment", "appointments",
    "schedule", "reschedule", "book", "reserve",
    "set up a meeting", "schedule a call", "calendar invite", "add to calendar",
    "check my calendar", "check calendar",
];

const TASKS_KEYWORDS: &[&str] = &[
    "task", "tasks", "todo", "todos", "to-do", "to do",
    "checklist", "action item",
    "create a task", "add task", "task list", "mark as done", "complete task",
];

// Bare "keep" is left out: it only means the notes app in phrases like "google keep".
const NOTES_KEYWORDS: &[&str] = &[
    "note", "notes", "memo", "memos", "reminder", "reminders",
    "jot down", "write down", "take note",
    "make a note", "add a note", "google keep", "keep a note", "create note", "save note",
];

/// Compiled keywords for one service
#[derive(Debug, Clone)]
struct ServiceKeywords {
    /// Multi-word phrases, matched by containment
    phrases: Vec<String>,
    /// Single words, matched on word boundaries
    words: Vec<String>,
    /// Alternation over `words`, anchored on non-word characters
    word_pattern: Option<Regex>,
}

impl ServiceKeywords {
    fn compile(service: Service, keywords: &[String]) -> Result<Self> {
        let mut phrases = Vec::new();
        let mut words = Vec::new();

        for keyword in keywords {
            let keyword = keyword.split_whitespace().collect::<Vec<_>>().join(" ");
            if keyword.is_empty() {
                continue;
            }
            let bucket = if keyword.contains(' ') { &mut phrases } else { &mut words };
            if !bucket.contains(&keyword) {
                bucket.push(keyword);
            }
        }

        let word_pattern = if words.is_empty() {
            None
        } else {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?:^|\W)(?:{})(?:\W|$)", alternation);
            Some(Regex::new(&pattern).map_err(|e| Error::InvalidConfig {
                field: format!("detector.extra_keywords.{}", service),
                reason: e.to_string(),
            })?)
        };

        Ok(Self {
            phrases,
            words,
            word_pattern,
        })
    }

    fn matches(&self, clause: &str) -> bool {
        if self.phrases.iter().any(|p| clause.contains(p.as_str())) {
            return true;
        }
        self.word_pattern
            .as_ref()
            .map(|re| re.is_match(clause))
            .unwrap_or(false)
    }
}

/// Immutable keyword table covering every service
///
/// Keywords are expected in lower case; matching runs on normalized text.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: [ServiceKeywords; 4],
}

impl KeywordTable {
    /// The built-in table
    pub fn builtin() -> Self {
        Self::from_keywords(builtin_keywords())
            .expect("built-in keyword table must compile")
    }

    /// Build a table from explicit keyword lists
    ///
    /// Services missing from `keywords` get an empty set.
    pub fn from_keywords(keywords: BTreeMap<Service, Vec<String>>) -> Result<Self> {
        let compile = |service: Service| {
            let list = keywords.get(&service).map(Vec::as_slice).unwrap_or(&[]);
            ServiceKeywords::compile(service, list)
        };

        Ok(Self {
            entries: [
                compile(Service::Mail)?,
                compile(Service::Calendar)?,
                compile(Service::Tasks)?,
                compile(Service::Notes)?,
            ],
        })
    }

    /// Built-in table plus the configured extra keywords
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let mut keywords = builtin_keywords();

        for (name, extra) in &config.extra_keywords {
            let service = Service::from_str(name).ok_or_else(|| Error::InvalidConfig {
                field: format!("detector.extra_keywords.{}", name),
                reason: "unknown service".to_string(),
            })?;
            debug!("Adding {} extra keywords for {}", extra.len(), service);
            keywords
                .entry(service)
                .or_default()
                .extend(extra.iter().map(|k| k.to_lowercase()));
        }

        Self::from_keywords(keywords)
    }

    /// Whether any keyword of `service` occurs in the clause
    pub fn matches(&self, clause: &str, service: Service) -> bool {
        self.entry(service).matches(clause)
    }

    /// All keywords for a service, single words first
    pub fn keywords(&self, service: Service) -> Vec<&str> {
        let entry = self.entry(service);
        entry
            .words
            .iter()
            .chain(entry.phrases.iter())
            .map(String::as_str)
            .collect()
    }

    fn entry(&self, service: Service) -> &ServiceKeywords {
        let index = match service {
            Service::Mail => 0,
            Service::Calendar => 1,
            Service::Tasks => 2,
            Service::Notes => 3,
        };
        &self.entries[index]
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

fn builtin_keywords() -> BTreeMap<Service, Vec<String>> {
    let to_owned = |list: &[&str]| list.iter().map(|k| k.to_string()).collect::<Vec<_>>();

    let mut keywords = BTreeMap::new();
    keywords.insert(Service::Mail, to_owned(MAIL_KEYWORDS));
    keywords.insert(Service::Calendar, to_owned(CALENDAR_KEYWORDS));
    keywords.insert(Service::Tasks, to_owned(TASKS_KEYWORDS));
    keywords.insert(Service::Notes, to_owned(NOTES_KEYWORDS));
    keywords
}
