//! Clause segmentation strategies
//!
//! Two strategies split normalized text into clauses:
//!
//! - [`ConjunctionSegmenter`] breaks on every coordinating conjunction token.
//! - [`DependencySegmenter`] breaks only where a conjunction joins two verb
//!   phrases, so noun coordinations like "emails and notes" stay together.
//!
//! Both operate on whitespace-separated tokens, so a conjunction embedded in a
//! longer word ("android", "thenceforth") is never a delimiter.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::config::DetectorConfig;
use crate::error::{Error, Result};

/// Tokens treated as clause delimiters
pub const CONJUNCTIONS: [&str; 5] = ["and", "&", "plus", "also", "then"];

/// Tokens skipped when looking for the head of the next clause
const FILLERS: [&str; 9] = ["please", "just", "i", "we", "you", "they", "he", "she", "can"];

const BUILTIN_VERBS: &[&str] = &[
    "add", "archive", "arrange", "ask", "book", "buy", "call", "cancel", "check", "clear",
    "complete", "compose", "confirm", "create", "delete", "draft", "edit", "email", "find",
    "finish", "follow", "forward", "get", "have", "help", "invite", "jot", "keep", "list",
    "look", "make", "mark", "message", "move", "need", "note", "open", "organize", "pay",
    "plan", "prepare", "put", "read", "remind", "remove", "reply", "reschedule", "reserve",
    "respond", "review", "save", "schedule", "search", "see", "send", "set", "share", "show",
    "start", "submit", "take", "tell", "text", "update", "want", "write",
];

/// Strategy for splitting normalized text into clauses
pub trait ClauseSegmenter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Split normalized text into ordered, non-empty clauses
    fn segment(&self, text: &str) -> Result<Vec<String>>;
}

/// Strip surrounding punctuation so "and," still reads as "and"
fn token_core(token: &str) -> &str {
    token.trim_matches(|c: char| c.is_ascii_punctuation() && c != '&')
}

/// Whether a token is a coordinating conjunction
pub fn is_conjunction(token: &str) -> bool {
    CONJUNCTIONS.contains(&token_core(token))
}

fn finish_clause(current: &mut Vec<&str>, clauses: &mut Vec<String>) {
    let clause = current.join(" ");
    let clause = clause.trim();
    if !clause.is_empty() {
        clauses.push(clause.to_string());
    }
    current.clear();
}

/// Splits on every conjunction token
#[derive(Debug, Clone, Copy, Default)]
pub struct ConjunctionSegmenter;

impl ConjunctionSegmenter {
    pub fn new() -> Self {
        Self
    }

    /// Infallible split; never returns an empty list for non-empty input
    pub fn split(&self, text: &str) -> Vec<String> {
        let mut clauses = Vec::new();
        let mut current = Vec::new();

        for token in text.split_whitespace() {
            if is_conjunction(token) {
                finish_clause(&mut current, &mut clauses);
            } else {
                current.push(token);
            }
        }
        finish_clause(&mut current, &mut clauses);

        if clauses.is_empty() {
            vec![text.to_string()]
        } else {
            clauses
        }
    }
}

impl ClauseSegmenter for ConjunctionSegmenter {
    fn name(&self) -> &'static str {
        "conjunction"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.split(text))
    }
}

/// Splits only where a conjunction coordinates two verb phrases
///
/// A conjunction breaks the text when the first content token after it
/// (skipping further conjunctions, pronouns and politeness fillers) is a verb
/// from the lexicon. Other conjunctions stay inside the clause.
#[derive(Debug, Clone)]
pub struct DependencySegmenter {
    verbs: HashSet<String>,
    max_tokens: usize,
}

impl DependencySegmenter {
    /// Create from an explicit verb list
    pub fn with_verbs<I, S>(verbs: I, max_tokens: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            verbs: verbs
                .into_iter()
                .map(|v| v.as_ref().trim().to_lowercase())
                .filter(|v| !v.is_empty())
                .collect(),
            max_tokens,
        }
    }

    /// Create with the built-in verb lexicon
    pub fn builtin(max_tokens: usize) -> Self {
        Self::with_verbs(BUILTIN_VERBS.iter().copied(), max_tokens)
    }

    /// Load a newline-delimited verb lexicon (`#` starts a comment)
    pub fn from_lexicon_file(path: &Path, max_tokens: usize) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::LexiconLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let verbs = contents
            .lines()
            .map(|line| line.split('#').next().unwrap_or_default().trim())
            .filter(|line| !line.is_empty());
        let segmenter = Self::with_verbs(verbs, max_tokens);

        if segmenter.verbs.is_empty() {
            return Err(Error::LexiconLoad {
                path: path.display().to_string(),
                reason: "lexicon contains no verbs".to_string(),
            });
        }

        info!(
            "Loaded {} verbs for dependency segmentation from {:?}",
            segmenter.verbs.len(),
            path
        );
        Ok(segmenter)
    }

    /// Create from detector configuration
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        match &config.lexicon_path {
            Some(path) => Self::from_lexicon_file(path, config.max_tokens),
            None => Ok(Self::builtin(config.max_tokens)),
        }
    }

    /// Whether a token is a known verb
    pub fn is_verb(&self, token: &str) -> bool {
        self.verbs.contains(token_core(token))
    }

    /// Index of the first content token at or after `start`
    fn next_content(&self, tokens: &[&str], start: usize) -> Option<usize> {
        (start..tokens.len()).find(|&i| {
            let core = token_core(tokens[i]);
            !is_conjunction(tokens[i]) && !FILLERS.contains(&core)
        })
    }
}

impl ClauseSegmenter for DependencySegmenter {
    fn name(&self) -> &'static str {
        "dependency"
    }

    fn segment(&self, text: &str) -> Result<Vec<String>> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.len() > self.max_tokens {
            return Err(Error::Segmentation(format!(
                "input has {} tokens, limit is {}",
                tokens.len(),
                self.max_tokens
            )));
        }

        let mut clauses = Vec::new();
        let mut current = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            if is_conjunction(token) {
                if let Some(head) = self.next_content(&tokens, i + 1) {
                    if self.is_verb(tokens[head]) {
                        debug!("Coordinated verb phrase at '{}'", tokens[head]);
                        finish_clause(&mut current, &mut clauses);
                        // Drop the conjunction run but keep skipped subjects
                        i += 1;
                        while i < head && is_conjunction(tokens[i]) {
                            i += 1;
                        }
                        continue;
                    }
                }
            }
            current.push(token);
            i += 1;
        }
        finish_clause(&mut current, &mut clauses);

        if clauses.is_empty() {
            Ok(vec![text.to_string()])
        } else {
            Ok(clauses)
        }
    }
}
