//! Integration tests for the fb2pdf conversion pipeline.
//!
//! These tests exercise the full path from FB2 bytes to PDF output.
//! They verify:
//! - A minimal book produces a cover page and a body page with a footer
//! - Annotations are styled like body content
//! - Unknown elements are skipped and reported, or fatal
//! - Subtitles move to a new page instead of being stranded
//! - Output files appear only after a successful run
//! - PDF output is structurally valid

use std::fs;
use std::path::{Path, PathBuf};

use proptest::prelude::*;

use fb2pdf::font::FontVariant;
use fb2pdf::layout::PARAGRAPH_INDENT;
use fb2pdf::pdf::{PageElement, PdfDocument};
use fb2pdf::{default_output_path, ConvertError, ConvertOptions, Converter, Phase};

// ─── Helpers ────────────────────────────────────────────────────

fn book(description: &str, body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
{description}
<body>
{body}
</body>
</FictionBook>"#
    )
}

fn minimal_description() -> &'static str {
    "<description><title-info>\
       <author><first-name>Ivan</first-name><last-name>Petrov</last-name></author>\
       <book-title>The Book</book-title>\
       <date>2001</date>\
     </title-info></description>"
}

fn convert(source: &str) -> PdfDocument {
    Converter::new(ConvertOptions::default())
        .convert_bytes(source.as_bytes())
        .expect("conversion should succeed")
        .document
}

fn page_texts(doc: &PdfDocument, index: usize) -> Vec<String> {
    doc.pages()[index].texts().map(str::to_string).collect()
}

fn assert_valid_pdf(bytes: &[u8]) {
    assert!(bytes.len() > 50, "PDF too small to be valid");
    assert!(bytes.starts_with(b"%PDF-1.7"), "Missing PDF header");
    assert!(
        bytes.windows(5).any(|w| w == b"%%EOF"),
        "Missing %%EOF marker"
    );
    assert!(bytes.windows(4).any(|w| w == b"xref"), "Missing xref table");
    assert!(bytes.windows(7).any(|w| w == b"trailer"), "Missing trailer");
}

fn contains(bytes: &[u8], needle: &str) -> bool {
    bytes
        .windows(needle.len())
        .any(|w| w == needle.as_bytes())
}

// ─── Document Structure ─────────────────────────────────────────

#[test]
fn test_minimal_book_has_cover_and_body_page() {
    let source = book(
        minimal_description(),
        "<section><p>Hello world.</p></section>",
    );
    let mut doc = convert(&source);
    doc.close();

    assert_eq!(doc.page_count(), 2);

    let cover = page_texts(&doc, 0);
    assert_eq!(cover, ["Ivan Petrov", "THE BOOK", "2001"]);

    let body = page_texts(&doc, 1);
    assert_eq!(body[0], format!("{PARAGRAPH_INDENT}Hello world."));
    // Page number footer from page two onward, none on the cover.
    assert_eq!(body.last().map(String::as_str), Some("2"));
}

#[test]
fn test_cover_has_red_rule() {
    let doc = convert(&book(minimal_description(), ""));
    let rule = doc.pages()[0].elements.iter().find_map(|e| match e {
        PageElement::Line { y1, width, .. } => Some((*y1, *width)),
        PageElement::Text { .. } => None,
    });
    assert_eq!(rule, Some((170.0, 10.0)));
}

#[test]
fn test_every_later_page_is_numbered() {
    let paragraphs: String = (0..60).map(|i| format!("<p>Paragraph {i}</p>")).collect();
    let source = book(minimal_description(), &format!("<section>{paragraphs}</section>"));
    let mut doc = convert(&source);
    doc.close();

    assert!(doc.page_count() > 3);
    assert!(!page_texts(&doc, 0).contains(&"1".to_string()));
    for index in 1..doc.page_count() {
        let texts = page_texts(&doc, index);
        assert_eq!(texts.last(), Some(&(index + 1).to_string()));
    }
}

#[test]
fn test_annotation_is_styled_like_body() {
    let description = "<description><title-info>\
        <book-title>Annotated</book-title>\
        <annotation><p>Short <strong>bold</strong> note</p></annotation>\
        </title-info></description>";
    let doc = convert(&book(description, "<section><p>Body <strong>bold too</strong></p></section>"));

    let bold_runs: Vec<&str> = doc.pages()[1]
        .elements
        .iter()
        .filter_map(|e| match e {
            PageElement::Text { font, text, .. } if font.variant == FontVariant::Bold => {
                Some(text.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(bold_runs, ["bold", "bold too"]);
}

#[test]
fn test_titles_and_subtitles_become_bookmarks() {
    let body = "<section><title><p>Part One</p></title>\
                <subtitle>First</subtitle><p>a</p>\
                <subtitle>Second</subtitle><p>b</p></section>\
                <section><title><p>Part Two</p></title></section>";
    let doc = convert(&book(minimal_description(), body));

    let marks: Vec<(&str, usize)> = doc
        .bookmarks()
        .iter()
        .map(|b| (b.title.as_str(), b.level))
        .collect();
    assert_eq!(
        marks,
        [("Part One", 0), ("First", 1), ("Second", 1), ("Part Two", 0)]
    );
    // cover, annotation page, two title pages
    assert_eq!(doc.page_count(), 4);
}

// ─── Page Breaks ────────────────────────────────────────────────

fn subtitle_after(paragraphs: usize) -> PdfDocument {
    let filler: String = (0..paragraphs).map(|_| "<p>x</p>").collect();
    convert(&book("", &format!("<section>{filler}<subtitle>Late</subtitle></section>")))
}

#[test]
fn test_subtitle_near_bottom_moves_to_next_page() {
    let doc = subtitle_after(18);
    assert_eq!(doc.page_count(), 2);
    assert!(!page_texts(&doc, 0).contains(&"Late".to_string()));
    assert_eq!(page_texts(&doc, 1), ["Late"]);
    assert_eq!(doc.bookmarks()[0].page_index, 1);
}

#[test]
fn test_subtitle_that_fits_stays_on_page() {
    let doc = subtitle_after(5);
    assert_eq!(doc.page_count(), 1);
    assert_eq!(page_texts(&doc, 0).last().map(String::as_str), Some("Late"));
}

// ─── Unknown Elements ───────────────────────────────────────────

#[test]
fn test_unknown_elements_fail_when_not_skipping() {
    let source = book(minimal_description(), "<section><image/><p>x</p></section>");
    let options = ConvertOptions {
        skip_unknown: false,
        ..Default::default()
    };
    let result = Converter::new(options).convert_bytes(source.as_bytes());
    match result {
        Err(ConvertError::UnknownElement { name, .. }) => assert_eq!(name, "image"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("conversion should fail"),
    }
}

const UNKNOWN: [&str; 4] = ["image", "table", "cite", "empty-line"];

proptest! {
    #[test]
    fn prop_unknown_elements_reported_once(picks in proptest::collection::vec(0usize..4, 0..24)) {
        let body: String = picks
            .iter()
            .map(|&i| format!("<{0}><p>hidden</p></{0}><p>shown</p>", UNKNOWN[i]))
            .collect();
        let conversion = Converter::new(ConvertOptions::default())
            .convert_bytes(book("", &format!("<section>{body}</section>")).as_bytes())
            .unwrap();

        let mut expected: Vec<String> = picks.iter().map(|&i| UNKNOWN[i].to_string()).collect();
        expected.sort();
        expected.dedup();
        prop_assert_eq!(conversion.unknown_elements, expected);

        let hidden = conversion
            .document
            .pages()
            .iter()
            .flat_map(|p| p.texts())
            .any(|t| t.contains("hidden"));
        prop_assert!(!hidden);
    }
}

// ─── Embedded Fonts ─────────────────────────────────────────────

const SYSTEM_SANS: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

/// Zlib-inflate every stream in the file that decodes.
fn inflated_streams(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut streams = Vec::new();
    let mut rest = bytes;
    while let Some(start) = rest.windows(7).position(|w| w == b"stream\n") {
        let body = &rest[start + 7..];
        let Some(end) = body.windows(10).position(|w| w == b"\nendstream") else {
            break;
        };
        if let Ok(data) = miniz_oxide::inflate::decompress_to_vec_zlib(&body[..end]) {
            streams.push(data);
        }
        rest = &body[end + 10..];
    }
    streams
}

#[test]
fn test_font_dir_embeds_truetype_for_cyrillic_text() {
    let Ok(font) = fs::read(SYSTEM_SANS) else {
        eprintln!("skipping: {SYSTEM_SANS} not installed");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("common-regular.ttf"), &font).unwrap();

    let options = ConvertOptions {
        font_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let word = "Привет";
    let conversion = Converter::new(options)
        .convert_bytes(book("", &format!("<section><p>{word}</p></section>")).as_bytes())
        .unwrap();
    assert!(conversion.document.unencodable_chars().is_empty());
    let bytes = conversion.document.finish().unwrap();

    assert_valid_pdf(&bytes);
    assert!(contains(&bytes, "/CIDFontType2"));
    assert!(contains(&bytes, "/Identity-H"));
    assert!(contains(&bytes, "/ToUnicode"));
    assert!(contains(&bytes, "/W ["));

    let face = ttf_parser::Face::parse(&font, 0).unwrap();
    let glyphs: String = word
        .chars()
        .map(|ch| format!("{:04X}", face.glyph_index(ch).unwrap().0))
        .collect();
    let streams = inflated_streams(&bytes);
    assert!(
        streams.iter().any(|s| contains(s, &glyphs)),
        "no content stream draws glyphs {glyphs}"
    );
    // ToUnicode maps the first glyph back to U+041F.
    let first = format!("<{}> <041F>", &glyphs[..4]);
    assert!(streams.iter().any(|s| contains(s, &first)));
}

#[test]
fn test_standard_fonts_report_unencodable_text() {
    let conversion = Converter::new(ConvertOptions::default())
        .convert_bytes(book("", "<section><p>Да</p></section>").as_bytes())
        .unwrap();
    let chars: String = conversion.document.unencodable_chars().iter().collect();
    assert_eq!(chars, "Да");
}

// ─── Files ──────────────────────────────────────────────────────

#[test]
fn test_output_naming() {
    assert_eq!(default_output_path(Path::new("book.fb2")), PathBuf::from("book.pdf"));
    assert_eq!(
        default_output_path(Path::new("notes.txt")),
        PathBuf::from("notes.txt.pdf")
    );
}

#[test]
fn test_explicit_output_path_wins() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.fb2");
    fs::write(&input, book(minimal_description(), "<p>x</p>")).unwrap();
    let output = dir.path().join("custom.out");

    Converter::new(ConvertOptions::default())
        .convert_file(&input, &output)
        .unwrap();

    assert!(output.exists());
    assert!(!dir.path().join("book.pdf").exists());
}

#[test]
fn test_pdf_is_structurally_valid() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("book.fb2");
    let body = "<section><title><p>Chapter</p></title><p>Text</p></section>";
    fs::write(&input, book(minimal_description(), body)).unwrap();
    let output = default_output_path(&input);

    let report = Converter::new(ConvertOptions::default())
        .convert_file(&input, &output)
        .unwrap();

    let bytes = fs::read(&output).unwrap();
    assert_valid_pdf(&bytes);
    assert!(contains(&bytes, "/Type /Outlines"));
    assert!(contains(&bytes, "/Title (Chapter)"));
    assert!(contains(&bytes, "/Author (Ivan Petrov)"));
    assert_eq!(report.pages, 3);
}

#[test]
fn test_failed_conversion_creates_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("broken.fb2");
    fs::write(&input, "<FictionBook><body><p>unclosed</section></body></FictionBook>").unwrap();
    let output = default_output_path(&input);

    let err = Converter::new(ConvertOptions::default())
        .convert_file(&input, &output)
        .unwrap_err();

    assert_eq!(err.phase(), Phase::Parse);
    assert!(!output.exists());
}

#[test]
fn test_render_shortcut() {
    let bytes = fb2pdf::render(book(minimal_description(), "<p>x</p>").as_bytes()).unwrap();
    assert_valid_pdf(&bytes);
}
