use std::sync::{Arc, Mutex};
use std::time::Duration;

use medrag_answer::{
    AnswerGenerator, ChatService, ContextAssembler, GenerateError, Generation, GenerationConfig, GenerativeModel, Usage,
};
use medrag_core::config::GenerationSettings;
use medrag_core::traits::Retrieve;
use medrag_core::types::{Chunk, DocumentMetadata, ScoredChunk, SourceTag};
use medrag_core::Error;
use medrag_embed::FakeEmbedder;
use medrag_vector::{IndexHandle, Retriever, VectorIndex};

enum Reply {
    Text(&'static str),
    Fail,
}

struct StubModel {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl StubModel {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self { reply, prompts: Mutex::new(Vec::new()) })
    }
}

impl GenerativeModel for StubModel {
    fn model_name(&self) -> &str {
        "stub"
    }

    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<Generation, GenerateError> {
        assert_eq!(config.max_output_tokens, 512);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.reply {
            Reply::Text(t) => Ok(Generation {
                text: t.to_string(),
                usage: Some(Usage { prompt_tokens: 10, candidate_tokens: 2, total_tokens: 12 }),
            }),
            Reply::Fail => Err(GenerateError::Status { status: 500, body: "boom".into() }),
        }
    }
}

enum FixedRetriever {
    Hits(Vec<ScoredChunk>),
    NotReady,
    Offline,
}

impl Retrieve for FixedRetriever {
    fn retrieve(&self, _query: &str) -> Result<Vec<ScoredChunk>, Error> {
        match self {
            FixedRetriever::Hits(hits) => Ok(hits.clone()),
            FixedRetriever::NotReady => Err(Error::IndexNotReady),
            FixedRetriever::Offline => Err(Error::ModelUnavailable("offline".into())),
        }
    }
}

fn chunk(i: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("answers:{i}#0"),
        text: text.to_string(),
        metadata: DocumentMetadata {
            source: SourceTag::Answers,
            id: i.to_string(),
            title: "水果".into(),
            page: None,
            path: None,
        },
        chunk_index: 0,
        total_chunks: 1,
        overlap: 0,
    }
}

fn generator(model: Arc<StubModel>) -> AnswerGenerator {
    AnswerGenerator::new(model, &GenerationSettings::default())
}

#[test]
fn failing_model_yields_fallback() {
    let answer = generator(StubModel::new(Reply::Fail)).generate("可以吃水果嗎？", "相關內容");
    assert_eq!(answer.text, "不好意思，我不清楚。");
    assert!(answer.fallback);
    assert_eq!(answer.usage, None);
}

#[test]
fn blank_reply_yields_fallback() {
    let answer = generator(StubModel::new(Reply::Text("  \n"))).generate("q", "c");
    assert_eq!(answer.text, "不好意思，我不清楚。");
    assert!(answer.fallback);
}

#[test]
fn model_reply_is_returned_trimmed_with_usage() {
    let model = StubModel::new(Reply::Text(" 每天兩份水果。\n"));
    let answer = generator(model.clone()).generate("每天建議吃多少水果？", "每天兩份水果");
    assert_eq!(answer.text, "每天兩份水果。");
    assert!(!answer.fallback);
    assert_eq!(answer.usage.map(|u| u.total_tokens), Some(12));
    let prompts = model.prompts.lock().unwrap();
    assert!(prompts[0].contains("每天兩份水果\n------"));
    assert!(prompts[0].ends_with("每天建議吃多少水果？\n"));
}

#[test]
fn service_orders_context_by_score() {
    let model = StubModel::new(Reply::Text("好"));
    let hits = vec![
        ScoredChunk { chunk: chunk(0, "次要"), score: Some(0.2) },
        ScoredChunk { chunk: chunk(1, "最相關"), score: Some(0.8) },
    ];
    let service = ChatService::new(Arc::new(FixedRetriever::Hits(hits)), ContextAssembler::default(), generator(model));
    let reply = service.answer("問題").expect("reply");
    assert_eq!(reply.context, "最相關\n---\n次要");
    assert_eq!(reply.hits.len(), 2);
    assert_eq!(reply.answer.text, "好");
}

#[test]
fn index_not_ready_propagates_other_retrieval_errors_do_not() {
    let model = StubModel::new(Reply::Text("好"));
    let not_ready = ChatService::new(
        Arc::new(FixedRetriever::NotReady),
        ContextAssembler::default(),
        generator(model.clone()),
    );
    assert!(matches!(not_ready.answer("q"), Err(Error::IndexNotReady)));

    let broken = ChatService::new(
        Arc::new(FixedRetriever::Offline),
        ContextAssembler::default(),
        generator(model.clone()),
    );
    let reply = broken.answer("q").expect("fallback reply");
    assert!(reply.answer.fallback);
    assert_eq!(reply.answer.text, "不好意思，我不清楚。");
    assert!(model.prompts.lock().unwrap().is_empty());
}

#[test]
fn batch_answers_in_order_with_real_retriever() {
    let chunks = vec![
        chunk(0, "一份水果大約是一個拳頭大小"),
        chunk(1, "紅豆屬於全穀雜糧類"),
        chunk(2, "運動前後要監測血糖"),
    ];
    let index = VectorIndex::build(chunks, Arc::new(FakeEmbedder::new(64)), 8).expect("build");
    let retriever = Retriever::new(IndexHandle::with_index(index), 2).expect("retriever");
    let model = StubModel::new(Reply::Text("答"));
    let service = ChatService::new(Arc::new(retriever), ContextAssembler::default(), generator(model.clone()));

    let questions = vec!["一份水果是多少？".to_string(), "紅豆是什麼？".to_string()];
    let replies = service.answer_batch(&questions, Duration::ZERO).expect("batch");
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0].question, questions[0]);
    assert_eq!(replies[1].question, questions[1]);
    assert!(replies.iter().all(|r| r.hits.len() == 2 && r.context.contains("\n---\n")));
    assert_eq!(model.prompts.lock().unwrap().len(), 2);
}
