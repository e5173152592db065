use std::sync::Arc;
use std::time::Duration;

use medrag_core::error::Error;
use medrag_core::traits::Retrieve;
use medrag_core::types::ScoredChunk;
use tracing::{info, warn};

use crate::context::ContextAssembler;
use crate::generator::{Answer, AnswerGenerator};

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub question: String,
    pub answer: Answer,
    pub context: String,
    pub hits: Vec<ScoredChunk>,
}

/// Retrieve, assemble, generate. Only a missing index is reported as an
/// error; every other failure yields the fallback reply.
pub struct ChatService {
    retriever: Arc<dyn Retrieve>,
    assembler: ContextAssembler,
    generator: AnswerGenerator,
}

impl ChatService {
    pub fn new(retriever: Arc<dyn Retrieve>, assembler: ContextAssembler, generator: AnswerGenerator) -> Self {
        Self { retriever, assembler, generator }
    }

    pub fn answer(&self, question: &str) -> Result<ChatReply, Error> {
        let hits = match self.retriever.retrieve(question) {
            Ok(hits) => hits,
            Err(Error::IndexNotReady) => return Err(Error::IndexNotReady),
            Err(e) => {
                warn!(error = %e, "retrieval failed, answering with fallback");
                return Ok(ChatReply {
                    question: question.to_string(),
                    answer: self.generator.fallback(),
                    context: String::new(),
                    hits: Vec::new(),
                });
            }
        };
        let context = self.assembler.assemble(&hits);
        let answer = self.generator.generate(question, &context);
        Ok(ChatReply { question: question.to_string(), answer, context, hits })
    }

    /// Answer in order, sleeping `pause` between consecutive model calls.
    pub fn answer_batch(&self, questions: &[String], pause: Duration) -> Result<Vec<ChatReply>, Error> {
        let mut replies = Vec::with_capacity(questions.len());
        for (i, question) in questions.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                std::thread::sleep(pause);
            }
            info!(index = i + 1, total = questions.len(), "answering");
            replies.push(self.answer(question)?);
        }
        Ok(replies)
    }
}
