//! The built-in model catalog: the on-demand Bedrock text models this
//! deployment offers. Entries without a registered adapter family are
//! still listed; `ModelRegistry::is_servable` tells them apart.

use pl_domain::model::ModelDescriptor;

const BEDROCK_TEXT_MODELS: &[(&str, &str, bool)] = &[
    ("amazon.titan-text-express-v1", "Titan Text G1 - Express", true),
    ("amazon.titan-text-lite-v1", "Titan Text G1 - Lite", true),
    ("anthropic.claude-v2:1", "Claude", true),
    ("anthropic.claude-3-sonnet-20240229-v1:0", "Claude 3 Sonnet", true),
    ("anthropic.claude-3-5-sonnet-20240620-v1:0", "Claude 3.5 Sonnet", true),
    ("anthropic.claude-3-haiku-20240307-v1:0", "Claude 3 Haiku", true),
    ("anthropic.claude-instant-v1", "Claude Instant", true),
    ("ai21.j2-mid-v1", "Jurassic-2 Mid", false),
    ("ai21.j2-ultra-v1", "Jurassic-2 Ultra", false),
    ("cohere.command-text-v14", "Command", true),
    ("cohere.command-light-text-v14", "Command Light", true),
    ("meta.llama2-13b-chat-v1", "Llama 2 Chat 13B", true),
    ("meta.llama2-70b-chat-v1", "Llama 2 Chat 70B", true),
    ("meta.llama3-8b-instruct-v1:0", "Llama 3 8B Instruct", true),
    ("meta.llama3-70b-instruct-v1:0", "Llama 3 70B Instruct", true),
    ("mistral.mistral-7b-instruct-v0:2", "Mistral 7B Instruct", true),
    ("mistral.mixtral-8x7b-instruct-v0:1", "Mixtral 8x7B Instruct", true),
];

pub fn bedrock_text_models() -> Vec<ModelDescriptor> {
    BEDROCK_TEXT_MODELS
        .iter()
        .map(|(model_id, name, streaming)| ModelDescriptor {
            provider: "bedrock".into(),
            model_id: (*model_id).into(),
            name: (*name).into(),
            streaming: *streaming,
            input_modalities: vec!["TEXT".into()],
            output_modalities: vec!["TEXT".into()],
            interface: "langchain".into(),
            rag_supported: true,
        })
        .collect()
}
