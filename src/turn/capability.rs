// src/turn/capability.rs
// Static capability registry: model id -> provider, request kind, and
// supported request features. The assembler and the adapters both consult
// this table instead of special-casing model families inline.

use crate::llm::Provider;

/// What kind of request a model serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Chat,
    ImageGeneration,
}

/// A model's supported request features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelCapability {
    pub provider: Provider,
    pub kind: RequestKind,
    pub supports_vision: bool,
    pub supports_system_message: bool,
    pub supports_sampling_params: bool,
}

const OPENAI_IMAGE: ModelCapability = ModelCapability {
    provider: Provider::OpenAi,
    kind: RequestKind::ImageGeneration,
    supports_vision: false,
    supports_system_message: false,
    supports_sampling_params: false,
};

// o-series reasoning models accept neither system messages nor sampling
// parameters, and their chat endpoint has no vision path.
const OPENAI_REASONING: ModelCapability = ModelCapability {
    provider: Provider::OpenAi,
    kind: RequestKind::Chat,
    supports_vision: false,
    supports_system_message: false,
    supports_sampling_params: false,
};

const OPENAI_VISION_CHAT: ModelCapability = ModelCapability {
    provider: Provider::OpenAi,
    kind: RequestKind::Chat,
    supports_vision: true,
    supports_system_message: true,
    supports_sampling_params: true,
};

const OPENAI_TEXT_CHAT: ModelCapability = ModelCapability {
    provider: Provider::OpenAi,
    kind: RequestKind::Chat,
    supports_vision: false,
    supports_system_message: true,
    supports_sampling_params: true,
};

const ANTHROPIC_VISION_CHAT: ModelCapability = ModelCapability {
    provider: Provider::Anthropic,
    kind: RequestKind::Chat,
    supports_vision: true,
    supports_system_message: true,
    supports_sampling_params: true,
};

const ANTHROPIC_TEXT_CHAT: ModelCapability = ModelCapability {
    provider: Provider::Anthropic,
    kind: RequestKind::Chat,
    supports_vision: false,
    supports_system_message: true,
    supports_sampling_params: true,
};

/// Ordered prefix-match table; first matching row wins. Adding a model is
/// adding a row here, nothing else changes.
const REGISTRY: &[(&[&str], &ModelCapability)] = &[
    (&["dall-e-3"], &OPENAI_IMAGE),
    (&["o1", "o3", "o4"], &OPENAI_REASONING),
    (&["gpt-4"], &OPENAI_VISION_CHAT),
    (&["gpt-"], &OPENAI_TEXT_CHAT),
    (
        &["claude-3.5-sonnet", "claude-3-5-sonnet", "claude-4"],
        &ANTHROPIC_VISION_CHAT,
    ),
    (&["claude-3"], &ANTHROPIC_TEXT_CHAT),
];

/// Resolve a model id to its capability descriptor. `None` means the model
/// is not served here (the caller reports it as an unsupported model).
pub fn lookup(model_id: &str) -> Option<&'static ModelCapability> {
    REGISTRY
        .iter()
        .find(|(prefixes, _)| prefixes.iter().any(|p| model_id.starts_with(p)))
        .map(|(_, capability)| *capability)
}
