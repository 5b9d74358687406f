//! Typed options consulted while a matcher chain runs.

use serde::{Deserialize, Serialize};

/// Options shared by a [`MatcherBuilder`](crate::MatcherBuilder) and handed to
/// every matcher call.
///
/// Unknown keys are rejected when deserializing, so a misspelled option
/// fails loudly instead of silently keeping its default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatcherConfig {
    /// Stop after the first matcher that yields at least one result.
    pub early_stop: bool,
    /// Collapse overlapping template-matching hits to the best box.
    /// Only the template matcher consults this flag.
    pub except_overlap: bool,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            early_stop: false,
            except_overlap: true,
        }
    }
}
