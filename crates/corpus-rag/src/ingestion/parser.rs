//! Multi-format file parser producing page-structured documents

use crate::error::{Error, Result};
use crate::types::{Document, Page};

/// Parses uploaded files into [`Document`]s with 1-based pages
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<Document> {
        let extension = filename.rsplit('.').next().unwrap_or("").to_lowercase();
        let mime = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();

        tracing::info!("Parsing file: {} ({})", filename, mime);

        let pages = match extension.as_str() {
            "pdf" => Self::parse_pdf(filename, data)?,
            "docx" => Self::parse_docx(filename, data)?,
            "txt" | "md" | "markdown" => Self::parse_text(data),
            other => return Err(Error::UnsupportedFileType(other.to_string())),
        };

        if pages.is_empty() {
            return Err(Error::file_parse(filename, "no text content extracted"));
        }

        let total_chars: usize = pages.iter().map(|p| p.text.len()).sum();
        tracing::info!(
            "Parsed {}: {} pages, {} characters",
            filename,
            pages.len(),
            total_chars
        );

        Ok(Document::new(
            filename.to_string(),
            mime,
            pages,
            "upload".to_string(),
        ))
    }

    /// Parse a PDF: extract full text, then split it across the page count
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<Vec<Page>> {
        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let text = text
            .replace('\0', "")
            .lines()
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n");

        let page_count = match lopdf::Document::load_mem(data) {
            Ok(doc) => doc.get_pages().len().max(1),
            Err(_) => 1,
        };

        Ok(Self::split_into_pages(&text, page_count))
    }

    /// Distribute extracted text across `page_count` pages
    ///
    /// pdf-extract returns the whole document as one string, so page
    /// boundaries are estimated: each page gets roughly an equal share,
    /// stretched to the next paragraph break when one falls shortly after
    /// the average cut point.
    fn split_into_pages(text: &str, page_count: usize) -> Vec<Page> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Vec::new();
        }
        if page_count <= 1 {
            return vec![Page {
                number: 1,
                text: trimmed.to_string(),
            }];
        }

        let chars: Vec<char> = trimmed.chars().collect();
        let avg = chars.len().div_ceil(page_count);
        let mut pages = Vec::with_capacity(page_count);
        let mut pos = 0usize;

        for i in 0..page_count {
            if pos >= chars.len() {
                break;
            }
            let end = if i == page_count - 1 {
                chars.len()
            } else {
                let base = (pos + avg).min(chars.len());
                Self::paragraph_break(&chars, base, 200).unwrap_or(base)
            };

            let page_text: String = chars[pos..end].iter().collect();
            let page_text = page_text.trim();
            if !page_text.is_empty() {
                pages.push(Page {
                    number: (i + 1) as u32,
                    text: page_text.to_string(),
                });
            }
            pos = end;
        }

        if pages.is_empty() {
            pages.push(Page {
                number: 1,
                text: trimmed.to_string(),
            });
        }
        pages
    }

    /// First blank-line break within `lookahead` chars after `from`
    fn paragraph_break(chars: &[char], from: usize, lookahead: usize) -> Option<usize> {
        let limit = (from + lookahead).min(chars.len().saturating_sub(1));
        (from..limit).find(|&i| chars[i] == '\n' && chars[i + 1] == '\n')
    }

    /// Parse a DOCX: paragraphs joined, sections on blank runs become pages
    fn parse_docx(filename: &str, data: &[u8]) -> Result<Vec<Page>> {
        let doc =
            docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
                for child in paragraph.children {
                    if let docx_rs::ParagraphChild::Run(run) = child {
                        for child in run.children {
                            if let docx_rs::RunChild::Text(text) = child {
                                content.push_str(&text.text);
                            }
                        }
                    }
                }
                content.push('\n');
            }
        }

        Ok(Self::split_sections(&content, "\n\n\n"))
    }

    /// Parse plain text or markdown: horizontal rules become page breaks
    fn parse_text(data: &[u8]) -> Vec<Page> {
        let content = String::from_utf8_lossy(data);
        let sections = Self::split_on_rules(&content);
        if sections.len() > 1 {
            sections
        } else {
            let trimmed = content.trim();
            if trimmed.is_empty() {
                Vec::new()
            } else {
                vec![Page {
                    number: 1,
                    text: trimmed.to_string(),
                }]
            }
        }
    }

    /// Split on `---` / `===` rule lines, numbering sections as pages
    fn split_on_rules(content: &str) -> Vec<Page> {
        let mut pages = Vec::new();
        let mut current = String::new();
        let mut number = 1u32;

        for line in content.lines() {
            let t = line.trim();
            if t == "---" || t == "===" {
                let section = current.trim();
                if !section.is_empty() {
                    pages.push(Page {
                        number,
                        text: section.to_string(),
                    });
                }
                number += 1;
                current.clear();
            } else {
                current.push_str(line);
                current.push('\n');
            }
        }
        let section = current.trim();
        if !section.is_empty() {
            pages.push(Page {
                number,
                text: section.to_string(),
            });
        }
        pages
    }

    /// Split on a literal separator, numbering non-empty sections
    fn split_sections(content: &str, separator: &str) -> Vec<Page> {
        let mut pages = Vec::new();
        for (i, section) in content.split(separator).enumerate() {
            let trimmed = section.trim();
            if !trimmed.is_empty() {
                pages.push(Page {
                    number: (i + 1) as u32,
                    text: trimmed.to_string(),
                });
            }
        }
        if pages.is_empty() {
            let trimmed = content.trim();
            if !trimmed.is_empty() {
                pages.push(Page {
                    number: 1,
                    text: trimmed.to_string(),
                });
            }
        }
        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_file_splits_on_horizontal_rules() {
        let data = b"First page here.\n---\nSecond page here.\n===\nThird page here.";
        let doc = FileParser::parse("notes.txt", data).expect("parse");
        assert_eq!(doc.pages.len(), 3);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.pages[0].text, "First page here.");
        assert_eq!(doc.pages[2].text, "Third page here.");
        assert_eq!(doc.total_pages, 3);
    }

    #[test]
    fn text_file_without_rules_is_one_page() {
        let doc = FileParser::parse("plain.md", b"Just one block of text.").expect("parse");
        assert_eq!(doc.pages.len(), 1);
        assert_eq!(doc.pages[0].text, "Just one block of text.");
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let err = FileParser::parse("binary.exe", b"MZ").expect_err("should reject");
        assert!(matches!(err, Error::UnsupportedFileType(_)));
    }

    #[test]
    fn empty_text_file_is_a_parse_error() {
        let err = FileParser::parse("empty.txt", b"   \n  ").expect_err("should fail");
        assert!(matches!(err, Error::FileParse { .. }));
    }

    #[test]
    fn page_split_prefers_paragraph_breaks() {
        let text = format!("{}\n\n{}", "a".repeat(60), "b".repeat(60));
        let pages = FileParser::split_into_pages(&text, 2);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].text.chars().all(|c| c == 'a'));
        assert!(pages[1].text.chars().all(|c| c == 'b'));
    }

    #[test]
    fn page_split_covers_all_text() {
        let text = "word ".repeat(100);
        let pages = FileParser::split_into_pages(text.trim(), 4);
        let joined: usize = pages.iter().map(|p| p.text.split_whitespace().count()).sum();
        assert_eq!(joined, 100);
    }
}
