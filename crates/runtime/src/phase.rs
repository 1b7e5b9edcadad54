//! Turn lifecycle: `Idle → EnrichingPrompt → Retrieving → Generating →
//! Persisting → Idle`. Retrieval may precede enrichment depending on the
//! configured order; every change is traced.

use std::fmt;

use pl_domain::trace::TraceEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    EnrichingPrompt,
    Retrieving,
    Generating,
    Persisting,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::EnrichingPrompt => "enriching_prompt",
            Self::Retrieving => "retrieving",
            Self::Generating => "generating",
            Self::Persisting => "persisting",
        }
    }
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The current phase of one turn.
#[derive(Debug)]
pub struct PhaseTracker {
    session_id: String,
    current: TurnPhase,
    visited: Vec<TurnPhase>,
}

impl PhaseTracker {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            current: TurnPhase::Idle,
            visited: vec![TurnPhase::Idle],
        }
    }

    pub fn current(&self) -> TurnPhase {
        self.current
    }

    /// Every phase entered so far, starting with `Idle`.
    pub fn visited(&self) -> &[TurnPhase] {
        &self.visited
    }

    pub fn advance(&mut self, to: TurnPhase) {
        if to == self.current {
            return;
        }
        TraceEvent::PhaseChanged {
            session_id: self.session_id.clone(),
            from: self.current.as_str().to_string(),
            to: to.as_str().to_string(),
        }
        .emit();
        tracing::debug!(from = %self.current, to = %to, "turn phase");
        self.current = to;
        self.visited.push(to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_transitions_once() {
        let mut p = PhaseTracker::new("s1");
        p.advance(TurnPhase::EnrichingPrompt);
        p.advance(TurnPhase::EnrichingPrompt);
        p.advance(TurnPhase::Generating);
        p.advance(TurnPhase::Persisting);
        p.advance(TurnPhase::Idle);
        assert_eq!(
            p.visited(),
            [
                TurnPhase::Idle,
                TurnPhase::EnrichingPrompt,
                TurnPhase::Generating,
                TurnPhase::Persisting,
                TurnPhase::Idle
            ]
        );
    }
}
