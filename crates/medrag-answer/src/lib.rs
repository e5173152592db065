#![deny(unused_imports)]
#![deny(unused_variables)]

pub mod context;
pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod service;

pub use context::ContextAssembler;
pub use gemini::GeminiClient;
pub use generator::{Answer, AnswerGenerator, GenerateError, Generation, GenerationConfig, GenerativeModel, Usage};
pub use prompt::PromptTemplate;
pub use service::{ChatReply, ChatService};
