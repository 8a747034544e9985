//! Service detection
//!
//! Decides which productivity services a free-form request concerns:
//! normalize the text, split it into clauses, test every clause against each
//! service's keywords, and OR the per-clause results together.

mod keywords;
mod segment;

pub use keywords::KeywordTable;
pub use segment::{
    is_conjunction, ClauseSegmenter, ConjunctionSegmenter, DependencySegmenter, CONJUNCTIONS,
};

pub use crate::config::SegmenterKind;

use std::sync::{Arc, LazyLock};

use tracing::{debug, info, warn};

use crate::config::DetectorConfig;
use crate::error::Result;
use crate::models::{Service, ServiceDetection};

/// Lower-case, collapse whitespace runs to one space, trim
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keyword-based service detector
///
/// Holds only read-only state, so one instance can serve any number of
/// threads at once.
pub struct ServiceDetector {
    table: Arc<KeywordTable>,
    conjunction: ConjunctionSegmenter,
    /// `None` when the dependency segmenter failed to initialize
    dependency: Option<Arc<dyn ClauseSegmenter>>,
    default_kind: SegmenterKind,
}

impl ServiceDetector {
    /// Create a detector over a keyword table with the built-in dependency lexicon
    pub fn new(table: Arc<KeywordTable>) -> Self {
        let defaults = DetectorConfig::default();
        Self {
            table,
            conjunction: ConjunctionSegmenter::new(),
            dependency: Some(Arc::new(DependencySegmenter::builtin(defaults.max_tokens))),
            default_kind: SegmenterKind::default(),
        }
    }

    /// Create from configuration
    ///
    /// Keyword errors are fatal. A dependency segmenter that cannot start
    /// only disables that strategy.
    pub fn from_config(config: &DetectorConfig) -> Result<Self> {
        let table = Arc::new(KeywordTable::from_config(config)?);

        let dependency: Option<Arc<dyn ClauseSegmenter>> =
            match DependencySegmenter::from_config(config) {
                Ok(segmenter) => Some(Arc::new(segmenter)),
                Err(e) => {
                    warn!(
                        "Dependency segmenter unavailable: {}, conjunction splitting will be used",
                        e
                    );
                    None
                }
            };

        info!("Service detector ready (default segmenter: {:?})", config.segmenter);

        Ok(Self {
            table,
            conjunction: ConjunctionSegmenter::new(),
            dependency,
            default_kind: config.segmenter,
        })
    }

    /// Replace the dependency strategy (`None` disables it)
    pub fn with_dependency_segmenter(mut self, segmenter: Option<Arc<dyn ClauseSegmenter>>) -> Self {
        self.dependency = segmenter;
        self
    }

    /// Set the strategy used by [`ServiceDetector::detect`]
    pub fn with_default_segmenter(mut self, kind: SegmenterKind) -> Self {
        self.default_kind = kind;
        self
    }

    /// The keyword table
    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// The strategy used by [`ServiceDetector::detect`]
    pub fn default_segmenter(&self) -> SegmenterKind {
        self.default_kind
    }

    /// Whether the dependency strategy is available
    pub fn has_dependency_segmenter(&self) -> bool {
        self.dependency.is_some()
    }

    /// Detect services with the default segmenter
    pub fn detect(&self, text: &str) -> ServiceDetection {
        self.detect_with(text, self.default_kind)
    }

    /// Detect services with an explicit segmenter
    pub fn detect_with(&self, text: &str, kind: SegmenterKind) -> ServiceDetection {
        let mut result = ServiceDetection::none();

        if text.trim().is_empty() {
            return result;
        }

        for clause in self.clauses(text, kind) {
            for service in Service::ALL {
                if !result.get(service) && self.table.matches(&clause, service) {
                    debug!("Detected {} in clause '{}'", service, clause);
                    result.mark(service);
                }
            }
        }

        result
    }

    /// Normalize and segment text into clauses
    ///
    /// Dependency segmentation falls back to conjunction splitting when it
    /// is unavailable or fails.
    pub fn clauses(&self, text: &str, kind: SegmenterKind) -> Vec<String> {
        let normalized = normalize(text);
        if normalized.is_empty() {
            return Vec::new();
        }

        match (kind, &self.dependency) {
            (SegmenterKind::Conjunction, _) => self.conjunction.split(&normalized),
            (SegmenterKind::Dependency, None) => {
                warn!("Dependency segmenter not available, falling back to conjunction splitting");
                self.conjunction.split(&normalized)
            }
            (SegmenterKind::Dependency, Some(segmenter)) => {
                match segmenter.segment(&normalized) {
                    Ok(clauses) if !clauses.is_empty() => clauses,
                    Ok(_) => self.conjunction.split(&normalized),
                    Err(e) => {
                        warn!(
                            "{} segmentation failed: {}, falling back to conjunction splitting",
                            segmenter.name(),
                            e
                        );
                        self.conjunction.split(&normalized)
                    }
                }
            }
        }
    }

    /// Detect with `kind` and log the result along with who asked
    pub fn detect_logged(
        &self,
        text: &str,
        kind: SegmenterKind,
        caller: Option<&str>,
    ) -> ServiceDetection {
        let result = self.detect_with(text, kind);
        let preview: String = text.chars().take(100).collect();
        info!(
            "Service detection for {} ({}): {} | Text: {}",
            caller.unwrap_or("anonymous"),
            kind.as_str(),
            result,
            preview
        );
        result
    }
}

impl Default for ServiceDetector {
    fn default() -> Self {
        Self::new(Arc::new(KeywordTable::builtin()))
    }
}

static DEFAULT_DETECTOR: LazyLock<ServiceDetector> = LazyLock::new(ServiceDetector::default);

/// Detect services with the built-in keyword table
///
/// `use_dependency` selects dependency-style segmentation.
pub fn detect_services(text: &str, use_dependency: bool) -> ServiceDetection {
    let kind = if use_dependency {
        SegmenterKind::Dependency
    } else {
        SegmenterKind::Conjunction
    };
    DEFAULT_DETECTOR.detect_with(text, kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(mail: bool, calendar: bool, tasks: bool, notes: bool) -> ServiceDetection {
        ServiceDetection {
            mail,
            calendar,
            tasks,
            notes,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Draft\tan   EMAIL\n"), "draft an email");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
    }

    #[test]
    fn test_reference_scenarios() {
        let cases = [
            ("Draft an email to Alice", detection(true, false, false, false)),
            ("Create a task and schedule a meeting", detection(false, true, true, false)),
            ("Check my calendar and reply to emails", detection(true, true, false, false)),
            ("", detection(false, false, false, false)),
            ("taskmaster tutorial", detection(false, false, false, false)),
        ];

        for (text, expected) in cases {
            assert_eq!(detect_services(text, false), expected, "input: {:?}", text);
        }
    }

    #[test]
    fn test_single_service_requests() {
        let cases = [
            ("Schedule a meeting for tomorrow", detection(false, true, false, false)),
            ("Create a task to review the report", detection(false, false, true, false)),
            ("Make a note about the project", detection(false, false, false, true)),
            ("Compose a mail to the team", detection(true, false, false, false)),
            ("Add appointment for next week", detection(false, true, false, false)),
            ("Create a to-do item", detection(false, false, true, false)),
            ("Jot down a reminder", detection(false, false, false, true)),
            ("I need to book a flight", detection(false, true, false, false)),
        ];

        for (text, expected) in cases {
            assert_eq!(detect_services(text, false), expected, "input: {:?}", text);
        }
    }

    #[test]
    fn test_cross_service_requests() {
        let cases = [
            ("Send an email and create a task", detection(true, false, true, false)),
            ("Schedule a meeting and send invites", detection(true, true, false, false)),
            (
                "Create a task and make a note and schedule an event",
                detection(false, true, true, true),
            ),
            (
                "Reply to John's message about the meeting tomorrow",
                detection(true, true, false, false),
            ),
            (
                "Can you help me schedule a call with Alice and then send her an email with the agenda?",
                detection(true, true, false, false),
            ),
            (
                "I need to check my calendar, reply to 3 emails, and create tasks for each one",
                detection(true, true, true, false),
            ),
        ];

        for (text, expected) in cases {
            assert_eq!(detect_services(text, false), expected, "input: {:?}", text);
            assert_eq!(detect_services(text, true), expected, "dependency input: {:?}", text);
        }
    }

    #[test]
    fn test_ambiguous_keep() {
        assert_eq!(
            detect_services("Keep working on the project", false),
            ServiceDetection::none()
        );
        assert!(detect_services("Save this in Google Keep", false).notes);
    }

    #[test]
    fn test_whitespace_only_input() {
        assert_eq!(detect_services("   ", false), ServiceDetection::none());
        assert_eq!(detect_services("\n\t", true), ServiceDetection::none());
    }

    #[test]
    fn test_union_across_clauses() {
        let detector = ServiceDetector::default();
        let left = detector.detect("draft a memo");
        let right = detector.detect("book the venue");
        let both = detector.detect("draft a memo and book the venue");
        assert_eq!(both, left.merge(right));
        assert!(both.mail && both.notes && both.calendar);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let detector = ServiceDetector::default();
        let text = "Add a task to review the report, then send an email to the team";
        assert_eq!(detector.detect(text), detector.detect(text));
    }

    #[test]
    fn test_dependency_unavailable_falls_back() {
        let detector = ServiceDetector::default().with_dependency_segmenter(None);
        assert!(!detector.has_dependency_segmenter());

        let text = "Create a task and schedule a meeting";
        assert_eq!(
            detector.detect_with(text, SegmenterKind::Dependency),
            detection(false, true, true, false)
        );
        assert_eq!(
            detector.clauses(text, SegmenterKind::Dependency),
            vec!["create a task", "schedule a meeting"]
        );
    }

    #[test]
    fn test_detect_logged_honors_segmenter() {
        let detector = ServiceDetector::default();
        assert_eq!(detector.default_segmenter(), SegmenterKind::Conjunction);

        let text = "Check my calendar and reply to emails";
        for kind in [SegmenterKind::Conjunction, SegmenterKind::Dependency] {
            assert_eq!(
                detector.detect_logged(text, kind, Some("alice")),
                detector.detect_with(text, kind),
                "segmenter: {}",
                kind.as_str()
            );
        }
        assert_eq!(
            detector.detect_logged(text, SegmenterKind::Dependency, None),
            detection(true, true, false, false)
        );
    }

    #[test]
    fn test_dependency_failure_falls_back() {
        let tiny: Arc<dyn ClauseSegmenter> = Arc::new(DependencySegmenter::builtin(2));
        let detector = ServiceDetector::default()
            .with_dependency_segmenter(Some(tiny))
            .with_default_segmenter(SegmenterKind::Dependency);

        assert_eq!(
            detector.clauses("email bob and book a room", SegmenterKind::Dependency),
            vec!["email bob", "book a room"]
        );
        assert_eq!(
            detector.detect("email bob and book a room"),
            detection(true, true, false, false)
        );
    }

    #[test]
    fn test_from_config_with_missing_lexicon() {
        let config = DetectorConfig {
            segmenter: SegmenterKind::Dependency,
            lexicon_path: Some(std::env::temp_dir().join("lume-no-such-lexicon.txt")),
            ..DetectorConfig::default()
        };

        let detector = ServiceDetector::from_config(&config).unwrap();
        assert!(!detector.has_dependency_segmenter());
        assert_eq!(detector.default_segmenter(), SegmenterKind::Dependency);
        assert!(detector.detect("draft an email").mail);
    }

    #[test]
    fn test_detection_always_has_four_keys() {
        let detector = ServiceDetector::default();
        for text in ["", "taskmaster", "email", "note and task and meeting and mail"] {
            let value = serde_json::to_value(detector.detect(text)).unwrap();
            assert_eq!(value.as_object().map(|o| o.len()), Some(4));
        }
    }

    #[test]
    fn test_concurrent_detection() {
        let detector = Arc::new(ServiceDetector::default());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let detector = detector.clone();
                std::thread::spawn(move || detector.detect("Create a task and schedule a meeting"))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), detection(false, true, true, false));
        }
    }
}
