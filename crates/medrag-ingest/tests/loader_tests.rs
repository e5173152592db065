use std::fs;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, Stream};
use tempfile::TempDir;

use medrag_core::config::{ChunkingSettings, DataSettings};
use medrag_core::SourceTag;
use medrag_ingest::corpus::{ingest, load_corpus, CorpusSources};
use medrag_ingest::loader::{load_article_csv, load_pdf_article, load_pdf_auto, load_qa_csv, try_load_article_csv};
use medrag_ingest::pdf::extract_pages;

#[test]
fn two_row_article_csv_yields_two_documents() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("articles.csv");
    fs::write(&path, "標題,內文\n認識糖尿病,糖尿病是慢性病。\n飲食原則,少油少糖。\n").unwrap();

    let docs = load_article_csv(&path);
    assert_eq!(docs.len(), 2);
    assert!(docs.iter().all(|d| d.text.starts_with("標題: ")));
    assert_eq!(docs[0].text, "標題: 認識糖尿病\n內容: 糖尿病是慢性病。");
    assert_eq!(docs[1].metadata.id, "1");
    assert_eq!(docs[1].metadata.source, SourceTag::Articles);
    assert_eq!(docs[1].metadata.page, None);
}

#[test]
fn header_casing_does_not_change_documents() {
    let tmp = TempDir::new().unwrap();
    let rows = "Fruit,Two servings a day.\nRed beans,Whole grains.\n";
    let a = tmp.path().join("a.csv");
    let b = tmp.path().join("b.csv");
    fs::write(&a, format!("title,content\n{rows}")).unwrap();
    fs::write(&b, format!(" TITLE , Content \n{rows}")).unwrap();

    let texts =
        |p: &Path| load_article_csv(p).into_iter().map(|d| (d.text, d.metadata.id)).collect::<Vec<_>>();
    let from_a = texts(&a);
    assert_eq!(from_a.len(), 2);
    assert_eq!(from_a, texts(&b));
}

#[test]
fn article_synonym_and_blank_rows() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("a.csv");
    fs::write(&path, "Title,Article\nA,body\n,no title\nB,  \nC,more\n").unwrap();

    let ids: Vec<String> = load_article_csv(&path).into_iter().map(|d| d.metadata.id).collect();
    assert_eq!(ids, vec!["0", "3"]);
}

#[test]
fn missing_columns_and_missing_files_yield_nothing() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.csv");
    fs::write(&path, "name,body\nx,y\n").unwrap();

    assert!(load_article_csv(&path).is_empty());
    assert!(matches!(try_load_article_csv(&path), Err(medrag_core::Error::SchemaMismatch { .. })));
    assert!(load_article_csv(&tmp.path().join("nope.csv")).is_empty());
    assert!(load_pdf_auto(&tmp.path().join("nope.pdf")).is_empty());
}

#[test]
fn qa_rows_become_question_and_answer_documents() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("qa.csv");
    let long_q = "糖".repeat(55);
    fs::write(
        &path,
        format!("標題,問題,回答\n水果,可以吃水果嗎,可以適量\n,{long_q},要看份量\n空白,只有問題,\n"),
    )
    .unwrap();

    let docs = load_qa_csv(&path);
    assert_eq!(docs.len(), 4);
    assert_eq!(docs[0].metadata.source, SourceTag::Questions);
    assert_eq!(docs[0].text, "標題: 水果\n問題: 可以吃水果嗎");
    assert_eq!(docs[1].metadata.source, SourceTag::Answers);
    assert_eq!(docs[1].text, "標題: 水果\n回答: 可以適量");
    let derived = format!("{}...", "糖".repeat(50));
    assert_eq!(docs[2].metadata.title, derived);
    assert_eq!(docs[3].metadata.id, "1");
}

#[test]
fn corpus_dir_discovery_classifies_csvs() {
    let tmp = TempDir::new().unwrap();
    let nested = tmp.path().join("nested");
    fs::create_dir_all(&nested).unwrap();
    fs::write(tmp.path().join("articles.csv"), "title,content\nA,alpha\n").unwrap();
    fs::write(nested.join("qa.csv"), "question,answer\nq?,a\n").unwrap();
    fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

    let sources = CorpusSources::discover(tmp.path());
    assert_eq!(sources.article_csvs, vec![tmp.path().join("articles.csv")]);
    assert_eq!(sources.qa_csvs, vec![nested.join("qa.csv")]);
    assert!(sources.pdf_articles.is_empty());
    assert_eq!(load_corpus(&sources).len(), 3);
}

#[test]
fn listed_files_are_not_loaded_twice() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("articles.csv");
    fs::write(&path, "標題,內文\n一,二\n").unwrap();
    let data = DataSettings {
        article_csvs: vec![path.clone()],
        qa_csvs: vec![],
        pdf_articles: vec![],
        pdf_qa: vec![],
        corpus_dir: Some(tmp.path().to_path_buf()),
        index_dir: tmp.path().join("index"),
    };

    let sources = CorpusSources::from_settings(&data);
    assert_eq!(sources.len(), 1);

    let chunks = ingest(&data, &ChunkingSettings::default()).expect("ingest");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].id, "articles:0#0");
}

/// One page per entry; `None` leaves the page without text.
fn write_pdf(path: &Path, pages: &[Option<&str>]) {
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let operations = match text {
            Some(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            None => vec![],
        };
        let content = Content { operations }.encode().expect("encode content");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }
    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("save pdf");
}

#[test]
fn pdf_text_page_becomes_one_article_and_blank_page_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("guide.pdf");
    write_pdf(&path, &[Some("Fruit Guide"), None]);

    let pages = extract_pages(&path).expect("pages");
    assert_eq!(pages.len(), 2);
    assert!(pages[1].trim().is_empty());

    let docs = load_pdf_article(&path);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].metadata.id, "guide_p1");
    assert_eq!(docs[0].metadata.page, Some(1));
    assert_eq!(docs[0].metadata.source, SourceTag::PdfArticle);
    assert_eq!(docs[0].metadata.title, "Fruit Guide");
    assert!(docs[0].text.starts_with("標題: Fruit Guide"));
}

#[test]
fn pdf_page_numbers_stay_aligned_across_blank_pages() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.pdf");
    write_pdf(&path, &[None, Some("Insulin basics"), None, Some("Foot care")]);

    let docs = load_pdf_auto(&path);
    let pages: Vec<(String, Option<u32>)> = docs.iter().map(|d| (d.metadata.id.clone(), d.metadata.page)).collect();
    assert_eq!(pages, vec![("notes_p2".to_string(), Some(2)), ("notes_p4".to_string(), Some(4))]);
    assert!(docs[0].text.contains("Insulin basics"));
    assert!(docs[1].text.contains("Foot care"));
}
