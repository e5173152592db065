//! Best-effort question/answer segmentation of unstructured page text.
//!
//! Labelled regimes are tried first (`問:/答:`, `Q:/A:`, `問題:/回答:`, each
//! plain then numbered). Without labels, sentences ending in a question mark
//! open a pair and the following sentences become its answer. The result is
//! heuristic; callers keep the whole page when it is empty.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

struct LabelPattern {
    question: Regex,
    answer: Regex,
}

fn label_patterns() -> &'static [LabelPattern] {
    static PATTERNS: OnceLock<Vec<LabelPattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let regimes = [("問", "答"), ("Q", "A"), ("問題", "回答")];
        let mut out = Vec::new();
        for (q, a) in regimes {
            for numbered in [false, true] {
                let label = |l: &str| {
                    let src = if numbered { format!(r"{l}\s*\d+[:：]") } else { format!("{l}[:：]") };
                    Regex::new(&src).expect("static label pattern")
                };
                out.push(LabelPattern { question: label(q), answer: label(a) });
            }
        }
        out
    })
}

/// Split `text` into question/answer pairs, or return an empty vector.
pub fn split_into_qa_pairs(text: &str) -> Vec<QaPair> {
    for pattern in label_patterns() {
        let pairs = extract_labelled(text, pattern);
        if !pairs.is_empty() {
            return pairs;
        }
    }
    split_on_question_marks(text)
}

fn next_boundary(text: &str, at: usize) -> Option<usize> {
    text[at..].chars().next().map(|c| at + c.len_utf8())
}

/// Each question runs from its label to the first answer label after it; the
/// answer runs to the next question label or the end of the text. Both need
/// at least one character before trimming.
fn extract_labelled(text: &str, pattern: &LabelPattern) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut cursor = 0usize;
    while let Some(q) = pattern.question.find_at(text, cursor) {
        let Some(answer_from) = next_boundary(text, q.end()) else { break };
        let Some(a) = pattern.answer.find_at(text, answer_from) else { break };
        let Some(next_from) = next_boundary(text, a.end()) else { break };
        let next_q = pattern.question.find_at(text, next_from);
        let answer_end = next_q.map_or(text.len(), |m| m.start());

        let question = text[q.end()..a.start()].trim();
        let answer = text[a.end()..answer_end].trim();
        if !question.is_empty() && !answer.is_empty() {
            pairs.push(QaPair { question: question.to_string(), answer: answer.to_string() });
        }
        match next_q {
            Some(m) => cursor = m.start(),
            None => break,
        }
    }
    pairs
}

const TERMINATORS: &[char] = &['。', '！', '？', '!', '?', '\n'];

fn is_question(sentence: &str) -> bool {
    sentence.ends_with('?') || sentence.ends_with('？')
}

/// Sentences with their terminators attached, trimmed, empties dropped.
fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut in_terminators = false;
    for (i, c) in text.char_indices() {
        let term = TERMINATORS.contains(&c);
        if in_terminators && !term {
            out.push(&text[start..i]);
            start = i;
        }
        in_terminators = term;
    }
    out.push(&text[start..]);
    out.into_iter().map(str::trim).filter(|s| !s.is_empty()).collect()
}

fn split_on_question_marks(text: &str) -> Vec<QaPair> {
    let sentences = sentences(text);
    let mut pairs = Vec::new();
    let mut i = 0usize;
    while i < sentences.len() {
        if !is_question(sentences[i]) {
            i += 1;
            continue;
        }
        let question = sentences[i];
        let mut j = i + 1;
        let mut parts = Vec::new();
        while j < sentences.len() && !is_question(sentences[j]) {
            let part = sentences[j].trim_end_matches(TERMINATORS).trim();
            if !part.is_empty() {
                parts.push(part);
            }
            j += 1;
        }
        if !parts.is_empty() {
            pairs.push(QaPair { question: question.to_string(), answer: parts.join("。") });
        }
        i = j;
    }
    pairs
}
