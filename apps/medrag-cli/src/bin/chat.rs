use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use medrag_answer::{AnswerGenerator, ChatReply, ChatService, ContextAssembler, GeminiClient};
use medrag_cli::{init_tracing, is_exit_word, load_settings, read_questions};
use medrag_embed::get_default_embedder;
use medrag_vector::{IndexHandle, Retriever, VectorIndex};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "medrag-chat", about = "Answer diabetes-care questions from the indexed corpus")]
struct Args {
    /// Question to answer; repeat for several. Without questions an interactive prompt starts.
    #[arg(long = "question", short = 'q')]
    questions: Vec<String>,

    /// File with one question per line.
    #[arg(long)]
    questions_file: Option<PathBuf>,

    /// Print the retrieved context under each answer.
    #[arg(long)]
    show_context: bool,

    #[arg(long, default_value = ".")]
    config_dir: PathBuf,
}

fn print_reply(reply: &ChatReply, show_context: bool) {
    println!("問：{}", reply.question);
    println!("答：{}", reply.answer.text);
    if show_context {
        println!("\n--- context ({} chunks) ---", reply.hits.len());
        for hit in &reply.hits {
            let score = hit.score.map(|s| format!("{s:.4}")).unwrap_or_else(|| "-".into());
            println!("[{}] {} ({})", score, hit.chunk.metadata.title, hit.chunk.id);
        }
        println!("{}", reply.context);
    }
    println!();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();
    let settings = load_settings(&args.config_dir)?;

    let embedder = get_default_embedder(&settings.embedding)?;
    let index = tokio::runtime::Runtime::new()?.block_on(VectorIndex::load(&settings.data.index_dir, embedder))?;
    info!(entries = index.len(), embedder = index.embedder_id(), "index loaded");

    let retriever = Retriever::new(IndexHandle::with_index(index), settings.retrieval.k)?;
    info!(k = retriever.k(), "retriever ready");
    let model = GeminiClient::from_settings(&settings.generation)?;
    let generator = AnswerGenerator::new(Arc::new(model), &settings.generation);
    let service = ChatService::new(Arc::new(retriever), ContextAssembler::default(), generator);

    let mut questions = args.questions.clone();
    if let Some(path) = &args.questions_file {
        questions.extend(read_questions(path)?);
    }
    if !questions.is_empty() {
        let pause = Duration::from_millis(settings.generation.batch_pause_ms);
        for reply in service.answer_batch(&questions, pause)? {
            print_reply(&reply, args.show_context);
        }
        return Ok(());
    }

    println!("糖尿病衛教問答（輸入 exit、quit、退出 或 結束 離開）");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if is_exit_word(question) {
            break;
        }
        let reply = service.answer(question)?;
        print_reply(&reply, args.show_context);
    }
    Ok(())
}
