//! In-process completion service for unit tests.

use pl_domain::error::Result;
use pl_domain::stream::{BoxStream, StreamEvent};

use crate::traits::{CompletionRequest, CompletionResponse, CompletionService};

/// Answers every prompt with `echo: {prompt}`.
#[derive(Default)]
pub(crate) struct EchoService;

#[async_trait::async_trait]
impl CompletionService for EchoService {
    async fn invoke(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        Ok(CompletionResponse {
            text: format!("echo: {}", req.prompt),
            usage: None,
            model: req.model_id.clone(),
            finish_reason: Some("stop".into()),
        })
    }

    async fn invoke_stream(
        &self,
        req: &CompletionRequest,
    ) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let events = vec![
            Ok(StreamEvent::Token {
                text: format!("echo: {}", req.prompt),
            }),
            Ok(StreamEvent::Done {
                usage: None,
                finish_reason: Some("stop".into()),
            }),
        ];
        Ok(Box::pin(futures_util::stream::iter(events)))
    }

    fn service_id(&self) -> &str {
        "echo"
    }
}
