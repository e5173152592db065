use std::fs;

use medrag_cli::{ensure_corpus, load_settings, read_questions};
use medrag_core::config::{ChunkingSettings, DataSettings};
use tempfile::TempDir;

#[test]
fn questions_file_skips_blank_lines() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("questions.txt");
    fs::write(&path, "一份水果是多少？\n\n  紅豆可以吃嗎？  \n").expect("write");
    assert_eq!(read_questions(&path).expect("read"), vec!["一份水果是多少？", "紅豆可以吃嗎？"]);
    assert!(read_questions(&tmp.path().join("missing.txt")).is_err());
}

#[test]
fn settings_resolve_paths_against_config_dir() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(
        tmp.path().join("config.toml"),
        "[data]\narticle_csvs = [\"data/articles.csv\"]\nindex_dir = \"vector_db\"\n\n[retrieval]\nk = 3\n",
    )
    .expect("write");
    let settings = load_settings(tmp.path()).expect("settings");
    assert_eq!(settings.retrieval.k, 3);
    assert_eq!(settings.data.index_dir, tmp.path().join("vector_db"));
    assert_eq!(settings.data.article_csvs, vec![tmp.path().join("data/articles.csv")]);
}

#[test]
fn invalid_settings_are_rejected() {
    let tmp = TempDir::new().expect("tmp");
    fs::write(tmp.path().join("config.toml"), "[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").expect("write");
    assert!(load_settings(tmp.path()).is_err());
}

#[test]
fn missing_sources_yield_no_chunks_and_are_refused() {
    let tmp = TempDir::new().expect("tmp");
    let data = DataSettings {
        article_csvs: vec![tmp.path().join("gone/articles.csv")],
        qa_csvs: vec![tmp.path().join("gone/qa.csv")],
        pdf_articles: vec![tmp.path().join("gone/articles.pdf")],
        pdf_qa: vec![],
        corpus_dir: Some(tmp.path().join("not-mounted")),
        index_dir: tmp.path().join("vector_db"),
    };
    let chunks = medrag_ingest::ingest(&data, &ChunkingSettings::default()).expect("ingest");
    assert!(chunks.is_empty());
    let err = ensure_corpus(&chunks).expect_err("empty corpus");
    assert!(err.to_string().contains("empty index"));
}

#[test]
fn non_empty_corpus_is_accepted() {
    let tmp = TempDir::new().expect("tmp");
    let csv = tmp.path().join("articles.csv");
    fs::write(&csv, "標題,內文\n認識糖尿病,糖尿病是慢性病。\n").expect("write");
    let data = DataSettings {
        article_csvs: vec![csv],
        qa_csvs: vec![],
        pdf_articles: vec![],
        pdf_qa: vec![],
        corpus_dir: None,
        index_dir: tmp.path().join("vector_db"),
    };
    let chunks = medrag_ingest::ingest(&data, &ChunkingSettings::default()).expect("ingest");
    assert_eq!(chunks.len(), 1);
    assert!(ensure_corpus(&chunks).is_ok());
}
