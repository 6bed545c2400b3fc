//! Detection patterns and the pattern library.
//!
//! A pattern is a named, ordered sequence of event identifiers. Ships with a
//! set of built-in Windows event-ID chains and supports custom patterns
//! loaded from a TOML file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// A named, ordered sequence of event identifiers.
///
/// Order is significant and the same identifier may appear more than once.
/// Immutable once constructed; the matcher never mutates patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub name: String,
    pub sequence: Vec<u32>,
}

impl Pattern {
    pub fn new(name: impl Into<String>, sequence: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            sequence,
        }
    }
}

/// TOML wrapper for custom pattern files:
///
/// ```toml
/// [[pattern]]
/// name = "custom_chain"
/// sequence = [4624, 4672, 7045]
/// ```
#[derive(Debug, Deserialize)]
struct PatternsFile {
    #[serde(default)]
    pattern: Vec<Pattern>,
}

/// Built-in detection patterns over Windows security/operational event IDs.
fn builtin_patterns() -> Vec<Pattern> {
    vec![
        // Successful logon, NTLM credential validation, privileged session,
        // then a new service installed.
        Pattern::new("Lateral Movement via RDP", vec![4624, 4776, 4672, 7045]),
        // Repeated failed logons immediately followed by a success.
        Pattern::new("Brute Force then Success", vec![4625, 4625, 4625, 4624]),
        // Privileged session, service installed, service state change.
        Pattern::new("Service Install after Privileged Logon", vec![4672, 7045, 7036]),
        // Logon followed by a scheduled task registration.
        Pattern::new("Scheduled Task Persistence", vec![4624, 4698]),
        // Real-time protection disabled, then a process creation.
        Pattern::new("Defender Tamper then Execution", vec![5001, 4688]),
        // The audit log was cleared.
        Pattern::new("Audit Log Cleared", vec![1102]),
    ]
}

/// An ordered, immutable collection of detection patterns.
///
/// Evaluation order is library order: the matcher stops at the first pattern
/// that completes, so earlier patterns take precedence. Construction is the
/// single validation point -- a pattern with an empty sequence is rejected
/// here, never at match time.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    patterns: Vec<Pattern>,
}

impl PatternLibrary {
    /// Build a library from the given patterns, in the given order.
    pub fn new(patterns: Vec<Pattern>) -> Result<Self> {
        for pattern in &patterns {
            if pattern.sequence.is_empty() {
                return Err(ConfigError::EmptyPattern {
                    name: pattern.name.clone(),
                });
            }
        }
        Ok(Self { patterns })
    }

    /// Build a library containing only the built-in patterns.
    pub fn builtin() -> Self {
        // Built-ins are compiled in and known to be non-empty.
        Self {
            patterns: builtin_patterns(),
        }
    }

    /// Load custom patterns from a TOML file and append them after the
    /// current contents, preserving evaluation precedence of earlier entries.
    pub fn load_custom(&mut self, path: &Path) -> Result<usize> {
        let contents = std::fs::read_to_string(path)?;
        let file: PatternsFile = toml::from_str(&contents)?;
        let count = file.pattern.len();
        for pattern in &file.pattern {
            if pattern.sequence.is_empty() {
                return Err(ConfigError::EmptyPattern {
                    name: pattern.name.clone(),
                });
            }
        }
        self.patterns.extend(file.pattern);
        Ok(count)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
