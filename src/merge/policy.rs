//! Conflict policies
//!
//! A conflict is a key that already exists in a sheet with different values.
//! The policy decides whether the incoming row replaces the stored one.

/// Two differing versions of the same row
#[derive(Debug, Clone, Copy)]
pub struct Conflict<'a> {
    pub sheet: &'a str,
    pub key: &'a str,
    pub old: &'a [String],
    pub new: &'a [String],
}

pub trait ConflictPolicy {
    /// `true` replaces the stored row with the incoming one
    fn replace(&mut self, conflict: &Conflict<'_>) -> bool;
}

/// Keep the stored row. Used when nobody is there to ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct SkipConflicts;

impl ConflictPolicy for SkipConflicts {
    fn replace(&mut self, _conflict: &Conflict<'_>) -> bool {
        false
    }
}

/// Always take the incoming row
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceConflicts;

impl ConflictPolicy for ReplaceConflicts {
    fn replace(&mut self, _conflict: &Conflict<'_>) -> bool {
        true
    }
}

/// Ask a callback. `None` (no answer) keeps the stored row.
pub struct PromptConflicts<F> {
    ask: F,
}

impl<F> PromptConflicts<F>
where
    F: FnMut(&Conflict<'_>) -> Option<bool>,
{
    pub fn new(ask: F) -> Self {
        Self { ask }
    }
}

impl<F> ConflictPolicy for PromptConflicts<F>
where
    F: FnMut(&Conflict<'_>) -> Option<bool>,
{
    fn replace(&mut self, conflict: &Conflict<'_>) -> bool {
        (self.ask)(conflict).unwrap_or(false)
    }
}

/// Parse a `[y/N]` answer
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_uppercase().as_str() {
        "Y" | "YES" => Some(true),
        "N" | "NO" => Some(false),
        _ => None,
    }
}
