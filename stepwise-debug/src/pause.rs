//! Pause-reason aggregation
//!
//! A single engine iteration can hit several stop conditions at once: the
//! target step completes while a breakpoint fires on the next step and the
//! runtime offers a choice. Reasons accumulate into a `PauseInformation`
//! and are formatted once, instead of branching per combination at every
//! stop site.

use std::collections::BTreeSet;

/// Why the engine stopped; variants are ordered as they appear in the
/// formatted reason string
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PauseReason {
    Pause,
    Start,
    Step,
    End,
    Choice,
    Breakpoint,
}

impl PauseReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pause => "pause",
            Self::Start => "start",
            Self::Step => "step",
            Self::End => "end",
            Self::Choice => "choice",
            Self::Breakpoint => "breakpoint",
        }
    }

    /// Description line for the reason, where one exists; breakpoint
    /// activations carry their own messages and `start` is self-evident
    fn headline(self) -> Option<&'static str> {
        match self {
            Self::Pause => Some("Paused on client request."),
            Self::Step => Some("Step completed."),
            Self::End => Some("Reached the end of the program."),
            Self::Choice => Some("Multiple steps are available; select one to continue."),
            Self::Start | Self::Breakpoint => None,
        }
    }
}

/// Accumulated stop conditions for one engine iteration
#[derive(Debug, Default)]
pub struct PauseInformation {
    reasons: BTreeSet<PauseReason>,
    messages: Vec<String>,
}

impl PauseInformation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reason: PauseReason) {
        self.reasons.insert(reason);
    }

    /// Record an activated breakpoint together with its message
    pub fn add_breakpoint(&mut self, message: String) {
        self.reasons.insert(PauseReason::Breakpoint);
        self.messages.push(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }

    #[must_use]
    pub fn has(&self, reason: PauseReason) -> bool {
        self.reasons.contains(&reason)
    }

    /// The composite reason, e.g. `"step and breakpoint"`
    #[must_use]
    pub fn reason_string(&self) -> String {
        self.reasons
            .iter()
            .map(|reason| reason.as_str())
            .collect::<Vec<_>>()
            .join(" and ")
    }

    /// Human-readable description: one line per high-priority reason,
    /// then the breakpoint messages
    #[must_use]
    pub fn description(&self) -> Option<String> {
        let mut lines: Vec<&str> = self
            .reasons
            .iter()
            .filter_map(|reason| reason.headline())
            .collect();
        lines.extend(self.messages.iter().map(String::as_str));
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
