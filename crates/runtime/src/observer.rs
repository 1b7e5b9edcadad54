use parking_lot::Mutex;
use pl_providers::CompletionObserver;

/// Records every prompt a turn issues, in dispatch order. One per turn.
#[derive(Debug, Default)]
pub struct PromptRecorder {
    prompts: Mutex<Vec<String>>,
    tokens: Mutex<usize>,
}

impl PromptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// Streamed tokens seen so far.
    pub fn token_count(&self) -> usize {
        *self.tokens.lock()
    }
}

impl CompletionObserver for PromptRecorder {
    fn on_prompt_issued(&self, prompt: &str) {
        self.prompts.lock().push(prompt.to_string());
    }

    fn on_token(&self, _token: &str) {
        *self.tokens.lock() += 1;
    }
}
