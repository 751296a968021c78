//! Query-time translation: language sniffing, prompt construction, the per-turn pipeline, and
//! the chat session that records turns.

pub mod language;
pub mod pipeline;
pub mod prompt;
pub mod session;

pub use language::{Language, LanguagePair, sniff_language};
pub use pipeline::{
    PipelineFailure, PipelineSettings, QuerySource, ResolvedQuery, RetrievalError,
    RewriteFailure, TranslationPipeline, TurnOutcome, TurnStage,
};
pub use prompt::{PromptFields, PromptTemplate, TemplateError};
pub use session::{ChatSession, ConversationTurn, Role, TurnReply};
