//! Corpus file loaders: CSV articles, CSV Q&A, PDF articles and PDF Q&A.
//!
//! Every loader degrades gracefully: an unreadable file or a file without the
//! required columns is logged and contributes zero documents.

use std::path::Path;

use csv::StringRecord;
use medrag_core::error::{Error, Result};
use medrag_core::types::{Document, DocumentMetadata, SourceTag};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{info, warn};

use crate::pdf::extract_pages;
use crate::qa_split::split_into_qa_pairs;

const TITLE: &[&str] = &["標題", "title"];
const CONTENT: &[&str] = &["內文", "content", "article"];
const QUESTION: &[&str] = &["問題", "question"];
const ANSWER: &[&str] = &["回答", "answer"];

const TITLE_CHARS: usize = 50;
const MAX_HEADING_CHARS: usize = 100;
const QA_SAMPLE_PAGES: usize = 3;

/// Index of the first header matching a synonym (trimmed, case-insensitive).
/// Synonyms are tried in order so the canonical Chinese header wins.
fn find_column(headers: &StringRecord, synonyms: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_lowercase())
        .collect();
    synonyms.iter().find_map(|syn| normalized.iter().position(|h| h == syn))
}

fn cell(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or("")
}

fn truncate_title(question: &str) -> String {
    let mut title: String = question.chars().take(TITLE_CHARS).collect();
    if question.chars().count() > TITLE_CHARS {
        title.push_str("...");
    }
    title
}

fn open_csv(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| Error::MissingInput { path: path.to_path_buf(), reason: e.to_string() })
}

fn read_headers(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> Result<StringRecord> {
    reader
        .headers()
        .cloned()
        .map_err(|e| Error::MissingInput { path: path.to_path_buf(), reason: e.to_string() })
}

fn records(reader: &mut csv::Reader<std::fs::File>, path: &Path) -> Vec<(usize, StringRecord)> {
    let mut rows = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        match row {
            Ok(r) => rows.push((idx, r)),
            Err(e) => warn!(path = %path.display(), row = idx, error = %e, "skipping unreadable csv row"),
        }
    }
    rows
}

fn degrade(path: &Path, result: Result<Vec<Document>>) -> Vec<Document> {
    match result {
        Ok(docs) => docs,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "source skipped");
            Vec::new()
        }
    }
}

/// Load an article table (`標題`/`title` + `內文`/`content`/`article`).
pub fn load_article_csv(path: &Path) -> Vec<Document> {
    degrade(path, try_load_article_csv(path))
}

pub fn try_load_article_csv(path: &Path) -> Result<Vec<Document>> {
    let mut reader = open_csv(path)?;
    let headers = read_headers(&mut reader, path)?;
    let (Some(title_col), Some(content_col)) = (find_column(&headers, TITLE), find_column(&headers, CONTENT)) else {
        return Err(Error::SchemaMismatch {
            path: path.to_path_buf(),
            expected: "標題/title, 內文/content/article".into(),
        });
    };
    info!(path = %path.display(), title = &headers[title_col], content = &headers[content_col], "article columns");

    let mut docs = Vec::new();
    for (idx, row) in records(&mut reader, path) {
        let title = cell(&row, title_col);
        let content = cell(&row, content_col);
        if title.is_empty() || content.is_empty() {
            continue;
        }
        docs.push(Document::new(
            format!("標題: {title}\n內容: {content}"),
            DocumentMetadata {
                source: SourceTag::Articles,
                id: idx.to_string(),
                title: title.to_string(),
                page: None,
                path: Some(path.to_string_lossy().into_owned()),
            },
        ));
    }
    Ok(docs)
}

/// Load a Q&A table (`問題`/`question` + `回答`/`answer`, optional `標題`/`title`).
/// Each row yields a question document and an answer document.
pub fn load_qa_csv(path: &Path) -> Vec<Document> {
    degrade(path, try_load_qa_csv(path))
}

pub fn try_load_qa_csv(path: &Path) -> Result<Vec<Document>> {
    let mut reader = open_csv(path)?;
    let headers = read_headers(&mut reader, path)?;
    let (Some(question_col), Some(answer_col)) = (find_column(&headers, QUESTION), find_column(&headers, ANSWER)) else {
        return Err(Error::SchemaMismatch { path: path.to_path_buf(), expected: "問題/question, 回答/answer".into() });
    };
    let title_col = find_column(&headers, TITLE);
    if title_col.is_none() {
        info!(path = %path.display(), "no title column, titles derived from questions");
    }

    let mut docs = Vec::new();
    for (idx, row) in records(&mut reader, path) {
        let question = cell(&row, question_col);
        let answer = cell(&row, answer_col);
        if question.is_empty() || answer.is_empty() {
            continue;
        }
        let title = match title_col.map(|c| cell(&row, c)) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => truncate_title(question),
        };
        let meta = |source| DocumentMetadata {
            source,
            id: idx.to_string(),
            title: title.clone(),
            page: None,
            path: Some(path.to_string_lossy().into_owned()),
        };
        docs.push(Document::new(format!("標題: {title}\n問題: {question}"), meta(SourceTag::Questions)));
        docs.push(Document::new(format!("標題: {title}\n回答: {answer}"), meta(SourceTag::Answers)));
    }
    Ok(docs)
}

/// Whether a CSV has the Q&A columns; used to classify files found by directory scan.
pub fn csv_has_qa_columns(path: &Path) -> bool {
    open_csv(path)
        .and_then(|mut r| read_headers(&mut r, path))
        .map(|h| find_column(&h, QUESTION).is_some() && find_column(&h, ANSWER).is_some())
        .unwrap_or(false)
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "document".to_string())
}

fn page_title(stem: &str, page: u32) -> String {
    format!("{stem} - 第 {page} 頁")
}

fn pdf_meta(source: SourceTag, id: String, title: &str, page: u32, path: &Path) -> DocumentMetadata {
    DocumentMetadata {
        source,
        id,
        title: title.to_string(),
        page: Some(page),
        path: Some(path.to_string_lossy().into_owned()),
    }
}

/// One article document per non-empty page. The first line becomes the title
/// when it is short enough to be a heading.
pub fn pdf_article_documents(path: &Path, pages: &[String]) -> Vec<Document> {
    let stem = file_stem(path);
    let mut docs = Vec::new();
    for (i, raw) in pages.iter().enumerate() {
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }
        let page = (i + 1) as u32;
        let first_line = content.lines().next().unwrap_or("");
        let title = if first_line.chars().count() < MAX_HEADING_CHARS {
            first_line.trim().to_string()
        } else {
            page_title(&stem, page)
        };
        docs.push(Document::new(
            format!("標題: {title}\n內容: {content}"),
            pdf_meta(SourceTag::PdfArticle, format!("{stem}_p{page}"), &title, page, path),
        ));
    }
    docs
}

/// Question and answer documents per detected pair; pages without pairs are
/// kept whole as articles.
pub fn pdf_qa_documents(path: &Path, pages: &[String]) -> Vec<Document> {
    let stem = file_stem(path);
    let mut docs = Vec::new();
    for (i, raw) in pages.iter().enumerate() {
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }
        let page = (i + 1) as u32;
        let pairs = split_into_qa_pairs(content);
        if pairs.is_empty() {
            let title = page_title(&stem, page);
            docs.push(Document::new(
                format!("標題: {title}\n內容: {content}"),
                pdf_meta(SourceTag::PdfArticle, format!("{stem}_p{page}"), &title, page, path),
            ));
            continue;
        }
        for (j, pair) in pairs.iter().enumerate() {
            let n = j + 1;
            let title = truncate_title(&pair.question);
            docs.push(Document::new(
                format!("標題: {title}\n問題: {}", pair.question),
                pdf_meta(SourceTag::PdfQuestions, format!("{stem}_p{page}_q{n}"), &title, page, path),
            ));
            docs.push(Document::new(
                format!("標題: {title}\n回答: {}", pair.answer),
                pdf_meta(SourceTag::PdfAnswers, format!("{stem}_p{page}_a{n}"), &title, page, path),
            ));
        }
    }
    docs
}

fn qa_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"(?i)問[:：]|答[:：]|問題[:：]|回答[:：]|q[:：]|a[:：]").expect("static qa marker")
    })
}

/// Sample the first pages: each scores one point for a Q&A label and one for
/// more than three question marks. Q&A-shaped when the score reaches the
/// number of sampled pages.
pub fn looks_like_qa(pages: &[String]) -> bool {
    let sample = pages.len().min(QA_SAMPLE_PAGES);
    if sample == 0 {
        return false;
    }
    let score: usize = pages[..sample]
        .iter()
        .map(|p| {
            let marks = p.chars().filter(|c| *c == '?' || *c == '？').count();
            usize::from(qa_marker().is_match(p)) + usize::from(marks > 3)
        })
        .sum();
    score >= sample
}

pub fn load_pdf_article(path: &Path) -> Vec<Document> {
    degrade(path, extract_pages(path).map(|pages| pdf_article_documents(path, &pages)))
}

pub fn load_pdf_qa(path: &Path) -> Vec<Document> {
    degrade(path, extract_pages(path).map(|pages| pdf_qa_documents(path, &pages)))
}

/// Article PDF that switches to the Q&A loader when its pages look like Q&A.
pub fn load_pdf_auto(path: &Path) -> Vec<Document> {
    degrade(
        path,
        extract_pages(path).map(|pages| {
            if looks_like_qa(&pages) {
                info!(path = %path.display(), "pdf looks like Q&A, using the Q&A loader");
                pdf_qa_documents(path, &pages)
            } else {
                pdf_article_documents(path, &pages)
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn pages(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn pdf_article_titles_from_first_line_or_page() {
        let long_line = "長".repeat(120);
        let docs = pdf_article_documents(
            &PathBuf::from("docs/diabetic_articles.pdf"),
            &pages(&["  認識糖尿病\n糖尿病是慢性病。", "", &format!("{long_line}\n內容")]),
        );
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata.title, "認識糖尿病");
        assert_eq!(docs[0].metadata.id, "diabetic_articles_p1");
        assert_eq!(docs[0].metadata.page, Some(1));
        assert!(docs[0].text.starts_with("標題: 認識糖尿病\n內容: 認識糖尿病"));
        assert_eq!(docs[1].metadata.title, "diabetic_articles - 第 3 頁");
        assert_eq!(docs[1].metadata.page, Some(3));
    }

    #[test]
    fn pdf_qa_pairs_and_whole_page_fallback() {
        let docs = pdf_qa_documents(
            &PathBuf::from("qa.pdf"),
            &pages(&["Q: 一份水果多少 A: 約一個拳頭\nQ: 可以喝果汁嗎 A: 不建議", "沒有問答的頁面。"]),
        );
        let ids: Vec<&str> = docs.iter().map(|d| d.metadata.id.as_str()).collect();
        assert_eq!(ids, vec!["qa_p1_q1", "qa_p1_a1", "qa_p1_q2", "qa_p1_a2", "qa_p2"]);
        assert_eq!(docs[0].metadata.source, SourceTag::PdfQuestions);
        assert_eq!(docs[1].text, "標題: 一份水果多少\n回答: 約一個拳頭");
        assert_eq!(docs[4].metadata.source, SourceTag::PdfArticle);
        assert_eq!(docs[4].metadata.title, "qa - 第 2 頁");
    }

    #[test]
    fn qa_detection_samples_first_pages() {
        assert!(looks_like_qa(&pages(&["問：a 答：b", "Q: x A: y", "q: z"])));
        assert!(!looks_like_qa(&pages(&["純文章內容。", "問：a 答：b"])));
        assert!(looks_like_qa(&pages(&["沒有標記但是很多問號？？？？"])));
        assert!(!looks_like_qa(&[]));
    }

    #[test]
    fn long_questions_get_truncated_titles() {
        let q = "問".repeat(60);
        let title = truncate_title(&q);
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
        assert_eq!(truncate_title("短問題"), "短問題");
    }
}
