use serde::Serialize;

/// Structured trace events emitted across all Parley crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    AdapterResolved {
        model_id: String,
        family: String,
    },
    PhaseChanged {
        session_id: String,
        from: String,
        to: String,
    },
    PromptEnriched {
        strategy: String,
        input_chars: usize,
        output_chars: usize,
        documents_previewed: usize,
        previews_truncated: usize,
        fallback: bool,
    },
    DocumentsRetrieved {
        workspace_id: String,
        count: usize,
        duration_ms: u64,
    },
    RetrievalCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    LlmRequest {
        service: String,
        model: String,
        streaming: bool,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    TranscriptAppend {
        session_id: String,
        lines: usize,
    },
    MetadataMerged {
        session_id: String,
        keys: usize,
    },
    TurnCompleted {
        session_id: String,
        model_id: String,
        retrieval: bool,
        documents: usize,
        prompts: usize,
        /// Tokens received from streamed completions; 0 when nothing streamed.
        streamed_tokens: usize,
        duration_ms: u64,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "pl_event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_completed_reports_streamed_tokens() {
        let event = TraceEvent::TurnCompleted {
            session_id: "s1".into(),
            model_id: "anthropic.claude-v2:1".into(),
            retrieval: true,
            documents: 2,
            prompts: 2,
            streamed_tokens: 17,
            duration_ms: 40,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "TurnCompleted");
        assert_eq!(json["streamed_tokens"], 17);
    }
}
