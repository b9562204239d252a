//! # PDF Serializer
//!
//! Takes the finished pages from [`PdfDocument`] and writes a valid PDF file.
//!
//! This is a from-scratch PDF 1.7 writer. The subset needed for a text book
//! (fonts, text, stroked lines, an outline, an info dictionary) is small
//! enough that writing the raw bytes ourselves keeps the crate
//! self-contained.
//!
//! ## PDF Structure (simplified)
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- objects (fonts, pages, content streams, outline, etc.)
//! 2 0 obj ... endobj
//! ...
//! xref                <- cross-reference table (byte offsets of each object)
//! trailer             <- points to the root object
//! %%EOF
//! ```
//!
//! ## Font Embedding
//!
//! Standard fonts (Helvetica, Courier) use simple Type1 references with
//! WinAnsiEncoding. TrueType fonts from a font directory are embedded as
//! CIDFontType2 with Identity-H encoding, producing 5 PDF objects per font:
//! FontFile2, FontDescriptor, CIDFont, ToUnicode CMap, and the root Type0
//! dictionary.

mod document;

pub use document::PdfDocument;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as FmtWrite; // for write! on String
use std::io::Write as IoWrite; // for write! on Vec<u8>

use miniz_oxide::deflate::compress_to_vec_zlib;
use serde::Serialize;

use crate::backend::Color;
use crate::font::{CustomFontMetrics, FontContext, FontData, FontFamily, FontKey, FontVariant};

/// Points per millimetre.
pub const PT_PER_MM: f64 = 72.0 / 25.4;

/// A finished page: everything drawn on it, in drawing order.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub elements: Vec<PageElement>,
}

impl Page {
    /// All text on the page, one string per text element.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            PageElement::Text { text, .. } => Some(text.as_str()),
            PageElement::Line { .. } => None,
        })
    }
}

/// A positioned drawing operation. Coordinates are millimetres from the
/// top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum PageElement {
    Text {
        x: f64,
        /// Baseline.
        y: f64,
        font: FontKey,
        /// Points.
        size: f64,
        text: String,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        color: Color,
        width: f64,
    },
}

/// A navigation entry collected while drawing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub title: String,
    pub level: usize,
    pub page_index: usize,
    pub y: f64,
}

/// Document-level metadata written to the Info dictionary and catalog.
#[derive(Debug, Clone, Default)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub lang: Option<String>,
}

pub struct PdfWriter;

/// Tracks allocated PDF objects during writing.
struct PdfBuilder {
    objects: Vec<PdfObject>,
    /// Font resources in /F0, /F1, ... order.
    font_objects: Vec<(FontKey, usize)>,
    /// Glyph mappings for embedded fonts, keyed by FontKey.
    custom_glyphs: HashMap<FontKey, HashMap<char, u16>>,
}

struct PdfObject {
    data: Vec<u8>,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Write finished pages to a PDF byte vector. `page_size` is in
    /// millimetres.
    pub fn write(
        &self,
        pages: &[Page],
        page_size: (f64, f64),
        bookmarks: &[Bookmark],
        info: &DocumentInfo,
        font_context: &FontContext,
    ) -> Vec<u8> {
        let mut builder = PdfBuilder {
            objects: Vec::new(),
            font_objects: Vec::new(),
            custom_glyphs: HashMap::new(),
        };

        // Reserve object IDs:
        // 0 = placeholder (PDF objects are 1-indexed)
        // 1 = Catalog
        // 2 = Pages (page tree root)
        // 3+ = fonts, then content streams and pages, then outline and info
        for _ in 0..3 {
            builder.objects.push(PdfObject { data: vec![] });
        }

        self.register_fonts(&mut builder, pages, font_context);

        let (width_pt, height_pt) = (page_size.0 * PT_PER_MM, page_size.1 * PT_PER_MM);
        let font_resources = self.build_font_resource_dict(&builder.font_objects);
        let mut page_obj_ids: Vec<usize> = Vec::new();

        for page in pages {
            let content = self.build_content_stream(page, page_size.1, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);

            let content_obj_id = builder.objects.len();
            let mut content_data: Vec<u8> = Vec::new();
            let _ = write!(
                content_data,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            content_data.extend_from_slice(&compressed);
            content_data.extend_from_slice(b"\nendstream");
            builder.objects.push(PdfObject { data: content_data });

            let page_obj_id = builder.objects.len();
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >> >>",
                width_pt, height_pt, content_obj_id, font_resources
            );
            builder.objects.push(PdfObject {
                data: page_dict.into_bytes(),
            });
            page_obj_ids.push(page_obj_id);
        }

        let outline_id = Self::write_outlines(&mut builder, bookmarks, &page_obj_ids, page_size.1);

        // Catalog (object 1)
        let mut catalog = String::from("<< /Type /Catalog /Pages 2 0 R");
        if let Some(id) = outline_id {
            let _ = write!(catalog, " /Outlines {} 0 R /PageMode /UseOutlines", id);
        }
        if let Some(ref lang) = info.lang {
            let _ = write!(catalog, " /Lang {}", Self::pdf_text_string(lang));
        }
        catalog.push_str(" >>");
        builder.objects[1].data = catalog.into_bytes();

        // Pages tree (object 2)
        let kids: String = page_obj_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2].data = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_obj_ids.len()
        )
        .into_bytes();

        // Info dictionary
        let info_obj_id = builder.objects.len();
        let mut info_dict = String::from("<< ");
        if let Some(ref title) = info.title {
            let _ = write!(info_dict, "/Title {} ", Self::pdf_text_string(title));
        }
        if let Some(ref author) = info.author {
            let _ = write!(info_dict, "/Author {} ", Self::pdf_text_string(author));
        }
        if let Some(ref subject) = info.subject {
            let _ = write!(info_dict, "/Subject {} ", Self::pdf_text_string(subject));
        }
        info_dict.push_str("/Producer (fb2pdf) /Creator (fb2pdf) >>");
        builder.objects.push(PdfObject {
            data: info_dict.into_bytes(),
        });

        self.serialize(&builder, info_obj_id)
    }

    /// Build the PDF content stream for a single page.
    fn build_content_stream(&self, page: &Page, page_height: f64, builder: &PdfBuilder) -> String {
        let mut stream = String::new();

        for element in &page.elements {
            match element {
                PageElement::Text {
                    x,
                    y,
                    font,
                    size,
                    text,
                } => {
                    let idx = Self::font_index(*font, &builder.font_objects);
                    let _ = write!(
                        stream,
                        "BT\n/F{} {:.2} Tf\n{:.2} {:.2} Td\n",
                        idx,
                        size,
                        x * PT_PER_MM,
                        (page_height - y) * PT_PER_MM
                    );

                    if let Some(char_to_gid) = builder.custom_glyphs.get(font) {
                        let mut hex = String::new();
                        for ch in text.chars() {
                            let gid = char_to_gid.get(&ch).copied().unwrap_or(0);
                            let _ = write!(hex, "{:04X}", gid);
                        }
                        let _ = write!(stream, "<{}> Tj\n", hex);
                    } else {
                        let _ = write!(stream, "({}) Tj\n", Self::encode_winansi(text));
                    }

                    stream.push_str("ET\n");
                }
                PageElement::Line {
                    x1,
                    y1,
                    x2,
                    y2,
                    color,
                    width,
                } => {
                    let _ = write!(
                        stream,
                        "q\n{:.3} {:.3} {:.3} RG\n{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                        color.r,
                        color.g,
                        color.b,
                        width * PT_PER_MM,
                        x1 * PT_PER_MM,
                        (page_height - y1) * PT_PER_MM,
                        x2 * PT_PER_MM,
                        (page_height - y2) * PT_PER_MM
                    );
                }
            }
        }

        stream
    }

    /// Register fonts used across all pages. Each distinct FontKey gets its
    /// own PDF font object.
    fn register_fonts(&self, builder: &mut PdfBuilder, pages: &[Page], font_context: &FontContext) {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            for element in &page.elements {
                if let PageElement::Text { font, text, .. } = element {
                    font_chars.entry(*font).or_default().extend(text.chars());
                }
            }
        }

        // Always have at least the body font
        if font_chars.is_empty() {
            font_chars.insert(
                FontKey::new(FontFamily::Common, FontVariant::Regular),
                BTreeSet::new(),
            );
        }

        for (key, used_chars) in &font_chars {
            match font_context.resolve(*key) {
                FontData::Standard(std_font) => {
                    let obj_id = builder.objects.len();
                    let font_dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    builder.objects.push(PdfObject {
                        data: font_dict.into_bytes(),
                    });
                    builder.font_objects.push((*key, obj_id));
                }
                FontData::Custom { data, metrics } => {
                    let type0_obj_id =
                        Self::write_custom_font_objects(builder, *key, data, metrics, used_chars);
                    builder.font_objects.push((*key, type0_obj_id));
                }
            }
        }
    }

    /// Write the 5 CIDFont PDF objects for an embedded TrueType font.
    /// Returns the object ID of the Type0 root font dictionary.
    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: FontKey,
        ttf_data: &[u8],
        metrics: &CustomFontMetrics,
        used_chars: &BTreeSet<char>,
    ) -> usize {
        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|ch| metrics.glyph_ids.get(ch).map(|&gid| (*ch, gid)))
            .collect();

        let pdf_font_name = Self::sanitize_font_name(key);
        let scale = 1000.0 / metrics.units_per_em as f64;

        // 1. FontFile2 stream, the whole TTF compressed
        let compressed_ttf = compress_to_vec_zlib(ttf_data, 6);
        let fontfile2_id = builder.objects.len();
        let mut fontfile2_data: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile2_data,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed_ttf.len(),
            ttf_data.len()
        );
        fontfile2_data.extend_from_slice(&compressed_ttf);
        fontfile2_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: fontfile2_data,
        });

        // 2. FontDescriptor
        let font_descriptor_id = builder.objects.len();
        let [x_min, y_min, x_max, y_max] = metrics.bbox;
        let bbox_str = format!(
            "[{} {} {} {}]",
            (x_min as f64 * scale) as i32,
            (y_min as f64 * scale) as i32,
            (x_max as f64 * scale) as i32,
            (y_max as f64 * scale) as i32,
        );
        let stem_v = if key.variant.is_bold() { 120 } else { 80 };
        let font_descriptor_dict = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox {} /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            bbox_str,
            if key.variant.is_italic() { -12 } else { 0 },
            (metrics.ascender as f64 * scale) as i32,
            (metrics.descender as f64 * scale) as i32,
            (metrics.cap_height as f64 * scale) as i32,
            stem_v,
            fontfile2_id,
        );
        builder.objects.push(PdfObject {
            data: font_descriptor_dict.into_bytes(),
        });

        // 3. CIDFont dictionary (DescendantFont)
        let cidfont_id = builder.objects.len();
        let w_array = Self::build_w_array(&char_to_gid, metrics);
        let cidfont_dict = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} \
             /CIDToGIDMap /Identity >>",
            pdf_font_name,
            font_descriptor_id,
            (metrics.default_advance as f64 * scale) as u32,
            w_array,
        );
        builder.objects.push(PdfObject {
            data: cidfont_dict.into_bytes(),
        });

        // 4. ToUnicode CMap
        let tounicode_id = builder.objects.len();
        let cmap_content = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap_content.as_bytes(), 6);
        let mut tounicode_data: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode_data,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode_data.extend_from_slice(&compressed_cmap);
        tounicode_data.extend_from_slice(b"\nendstream");
        builder.objects.push(PdfObject {
            data: tounicode_data,
        });

        // 5. Type0 font dictionary (the root, referenced by /Resources)
        let type0_id = builder.objects.len();
        let type0_dict = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} \
             /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] \
             /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        builder.objects.push(PdfObject {
            data: type0_dict.into_bytes(),
        });

        builder.custom_glyphs.insert(key, char_to_gid);

        type0_id
    }

    /// Build the /W array for per-glyph widths in CIDFont.
    /// Format: [gid [width] gid [width] ...]
    fn build_w_array(char_to_gid: &HashMap<char, u16>, metrics: &CustomFontMetrics) -> String {
        let scale = 1000.0 / metrics.units_per_em as f64;

        let mut entries: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(ch, &gid)| {
                let advance = metrics
                    .advance_widths
                    .get(ch)
                    .copied()
                    .unwrap_or(metrics.default_advance);
                (gid, (advance as f64 * scale) as u32)
            })
            .collect();
        entries.sort_by_key(|(gid, _)| *gid);
        entries.dedup_by_key(|(gid, _)| *gid);

        let mut result = String::from("[");
        for (gid, width) in &entries {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// Build a ToUnicode CMap for text extraction/copy-paste support.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        gid_to_unicode.sort_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo\n");
        cmap.push_str("<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = write!(cmap, "/CMapName /{}-UTF16 def\n", font_name);
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n");
        cmap.push_str("<0000> <FFFF>\n");
        cmap.push_str("endcodespacerange\n");

        // PDF limits beginbfchar to 100 entries per block
        for chunk in gid_to_unicode.chunks(100) {
            let _ = write!(cmap, "{} beginbfchar\n", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = write!(cmap, "<{:04X}> <{:04X}>\n", gid, unicode);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\n");
        cmap.push_str("end\n");

        cmap
    }

    /// Write the document outline. Each entry becomes a child of the
    /// closest preceding entry with a smaller level.
    fn write_outlines(
        builder: &mut PdfBuilder,
        bookmarks: &[Bookmark],
        page_obj_ids: &[usize],
        page_height: f64,
    ) -> Option<usize> {
        if bookmarks.is_empty() || page_obj_ids.is_empty() {
            return None;
        }
        let n = bookmarks.len();

        let root_id = builder.objects.len();
        let item_id = |i: usize| root_id + 1 + i;
        for _ in 0..=n {
            builder.objects.push(PdfObject { data: vec![] });
        }

        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut open: Vec<usize> = Vec::new();
        for (i, bookmark) in bookmarks.iter().enumerate() {
            while open
                .last()
                .is_some_and(|&top| bookmarks[top].level >= bookmark.level)
            {
                open.pop();
            }
            parent[i] = open.last().copied();
            open.push(i);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut roots: Vec<usize> = Vec::new();
        for (i, p) in parent.iter().enumerate() {
            match p {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }

        // Parents precede children, so a reverse pass sees every subtree
        // complete before adding it to its parent.
        let mut descendants = vec![0usize; n];
        for i in (0..n).rev() {
            if let Some(p) = parent[i] {
                descendants[p] += 1 + descendants[i];
            }
        }

        let mut write_siblings = |siblings: &[usize], parent_id: usize| {
            for (pos, &i) in siblings.iter().enumerate() {
                let bookmark = &bookmarks[i];
                let page_id = page_obj_ids[bookmark.page_index.min(page_obj_ids.len() - 1)];
                let mut dict = format!(
                    "<< /Title {} /Parent {} 0 R",
                    Self::pdf_text_string(&bookmark.title),
                    parent_id
                );
                if pos > 0 {
                    let _ = write!(dict, " /Prev {} 0 R", item_id(siblings[pos - 1]));
                }
                if let Some(&next) = siblings.get(pos + 1) {
                    let _ = write!(dict, " /Next {} 0 R", item_id(next));
                }
                if let (Some(&first), Some(&last)) = (children[i].first(), children[i].last()) {
                    let _ = write!(
                        dict,
                        " /First {} 0 R /Last {} 0 R /Count {}",
                        item_id(first),
                        item_id(last),
                        descendants[i]
                    );
                }
                let _ = write!(
                    dict,
                    " /Dest [{} 0 R /XYZ 0 {:.2} null] >>",
                    page_id,
                    (page_height - bookmark.y) * PT_PER_MM
                );
                builder.objects[item_id(i)].data = dict.into_bytes();
            }
        };

        write_siblings(&roots, root_id);
        for i in 0..n {
            write_siblings(&children[i], item_id(i));
        }

        builder.objects[root_id].data = format!(
            "<< /Type /Outlines /First {} 0 R /Last {} 0 R /Count {} >>",
            item_id(roots[0]),
            item_id(roots[roots.len() - 1]),
            n
        )
        .into_bytes();

        Some(root_id)
    }

    /// Sanitize a logical font name for use as a PDF name object.
    fn sanitize_font_name(key: FontKey) -> String {
        let suffix = match key.variant {
            FontVariant::Regular => "",
            FontVariant::Bold => "-Bold",
            FontVariant::Italic => "-Italic",
            FontVariant::BoldItalic => "-Bold-Italic",
        };
        format!("Fb2pdf-{}{}", key.family.name(), suffix)
    }

    fn build_font_resource_dict(&self, font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, obj_id))| format!("/F{} {} 0 R", i, obj_id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up the font index (/F0, /F1, etc.) for a font key.
    fn font_index(key: FontKey, font_objects: &[(FontKey, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(k, _)| *k == key)
            .unwrap_or(0)
    }

    /// Escape special characters in a PDF literal string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Encode a text string for the Info dictionary or outline: a literal
    /// for printable ASCII, UTF-16BE hex with a byte order mark otherwise.
    fn pdf_text_string(s: &str) -> String {
        if s.chars().all(|c| (' '..='~').contains(&c)) {
            return format!("({})", Self::escape_pdf_string(s));
        }
        let mut hex = String::from("<FEFF");
        for unit in s.encode_utf16() {
            let _ = write!(hex, "{:04X}", unit);
        }
        hex.push('>');
        hex
    }

    /// Encode text for a WinAnsi standard font. Unencodable characters
    /// become `?`.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::new();
        for ch in text.chars() {
            let b = Self::unicode_to_winansi(ch).unwrap_or(b'?');
            match b {
                b'\\' => out.push_str("\\\\"),
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                0x20..=0x7E => out.push(b as char),
                _ => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a Unicode codepoint to a WinAnsiEncoding byte value.
    ///
    /// WinAnsiEncoding is based on Windows-1252. Most codepoints in
    /// 0x20..=0x7E and 0xA0..=0xFF map directly. The 0x80..=0x9F range
    /// contains special mappings for smart quotes, bullets, dashes, etc.
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // Euro sign
            0x201A => Some(0x82), // Single low-9 quotation mark
            0x0192 => Some(0x83), // Latin small letter f with hook
            0x201E => Some(0x84), // Double low-9 quotation mark
            0x2026 => Some(0x85), // Horizontal ellipsis
            0x2020 => Some(0x86), // Dagger
            0x2021 => Some(0x87), // Double dagger
            0x02C6 => Some(0x88), // Modifier letter circumflex accent
            0x2030 => Some(0x89), // Per mille sign
            0x0160 => Some(0x8A), // Latin capital letter S with caron
            0x2039 => Some(0x8B), // Single left-pointing angle quotation
            0x0152 => Some(0x8C), // Latin capital ligature OE
            0x017D => Some(0x8E), // Latin capital letter Z with caron
            0x2018 => Some(0x91), // Left single quotation mark
            0x2019 => Some(0x92), // Right single quotation mark
            0x201C => Some(0x93), // Left double quotation mark
            0x201D => Some(0x94), // Right double quotation mark
            0x2022 => Some(0x95), // Bullet
            0x2013 => Some(0x96), // En dash
            0x2014 => Some(0x97), // Em dash
            0x02DC => Some(0x98), // Small tilde
            0x2122 => Some(0x99), // Trade mark sign
            0x0161 => Some(0x9A), // Latin small letter s with caron
            0x203A => Some(0x9B), // Single right-pointing angle quotation
            0x0153 => Some(0x9C), // Latin small ligature oe
            0x017E => Some(0x9E), // Latin small letter z with caron
            0x0178 => Some(0x9F), // Latin capital letter Y with diaeresis
            _ => None,
        }
    }

    /// Serialize all objects into the final PDF byte stream.
    fn serialize(&self, builder: &PdfBuilder, info_obj_id: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets: Vec<usize> = vec![0; builder.objects.len()];

        output.extend_from_slice(b"%PDF-1.7\n");
        output.extend_from_slice(b"%\xe2\xe3\xcf\xd3\n");

        for (i, obj) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(&obj.data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n", builder.objects.len());
        let _ = write!(output, "0000000000 65535 f \n");
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }

        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            builder.objects.len(),
            info_obj_id,
            xref_offset
        );

        output
    }
}
