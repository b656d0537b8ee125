//! Script admission filter.
//!
//! Measures how much of a text is written in the Arabic script blocks used for
//! Urdu (U+0600..=U+06FF and U+0750..=U+077F) relative to all alphabetic
//! characters. Digits, whitespace and ASCII punctuation are ignored.

use serde::Serialize;

/// Minimum target-script ratio accepted by default
pub const DEFAULT_SCRIPT_THRESHOLD: f64 = 0.8;

/// Whether `c` lies in one of the target script blocks.
#[inline]
pub fn in_target_script(c: char) -> bool {
    matches!(c, '\u{0600}'..='\u{06FF}' | '\u{0750}'..='\u{077F}')
}

/// Counts behind an admission decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScriptReport {
    pub target_chars: usize,
    pub alphabetic_chars: usize,
    pub ratio: f64,
    pub accepted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptFilter {
    threshold: f64,
}

impl Default for ScriptFilter {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SCRIPT_THRESHOLD,
        }
    }
}

impl ScriptFilter {
    /// `threshold` must lie in `(0, 1]`; config validation enforces it.
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn report(&self, text: &str) -> ScriptReport {
        let mut target_chars = 0usize;
        let mut alphabetic_chars = 0usize;
        for c in text.trim().chars() {
            let target = in_target_script(c);
            if target {
                target_chars += 1;
            }
            if target || c.is_alphabetic() {
                alphabetic_chars += 1;
            }
        }

        let ratio = if alphabetic_chars == 0 {
            0.0
        } else {
            target_chars as f64 / alphabetic_chars as f64
        };

        ScriptReport {
            target_chars,
            alphabetic_chars,
            ratio,
            accepted: alphabetic_chars > 0 && ratio >= self.threshold,
        }
    }

    pub fn accepts(&self, text: &str) -> bool {
        self.report(text).accepted
    }
}
