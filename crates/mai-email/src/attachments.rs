//! Attachment extraction dispatch (spec §4.13 step 3): images go to the
//! vision LLM, PDF/DOCX get text extraction, everything else is recorded as
//! unsupported. Each analysis also yields a short text blurb folded into
//! the turn text the dialog orchestrator sees, so the reply and the memory
//! extractors can reference what was attached.

use mai_llm::{LlmClient, VisionOptions};
use mai_memory::AttachmentMetadata;

const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;
const EXTRACTED_TEXT_TRUNCATE: usize = 5_000;
const PREVIEW_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Pdf,
    Docx,
    Unsupported,
}

pub fn classify(content_type: &str) -> AttachmentKind {
    let ct = content_type.to_lowercase();
    if ct.starts_with("image/") {
        AttachmentKind::Image
    } else if ct == "application/pdf" {
        AttachmentKind::Pdf
    } else if ct.contains("wordprocessingml.document") || ct == "application/msword" {
        AttachmentKind::Docx
    } else {
        AttachmentKind::Unsupported
    }
}

pub fn exceeds_size_limit(size: u64) -> bool {
    size > MAX_ATTACHMENT_BYTES
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        format!("{}...", &text[..max])
    }
}

/// One attachment's metadata row plus the text folded into the turn
/// (`None` when there's nothing worth telling the LLM, e.g. skipped or
/// unsupported).
pub struct AnalyzedAttachment {
    pub metadata: AttachmentMetadata,
    pub turn_text_excerpt: Option<String>,
}

pub async fn analyze(llm: &LlmClient, filename: &str, content_type: &str, bytes: &[u8]) -> AnalyzedAttachment {
    let size = bytes.len() as u64;
    if exceeds_size_limit(size) {
        return AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: "skipped: exceeds 10 MB limit".into(),
            },
            turn_text_excerpt: None,
        };
    }

    match classify(content_type) {
        AttachmentKind::Image => analyze_image(llm, filename, content_type, size, bytes).await,
        AttachmentKind::Pdf => analyze_pdf(filename, content_type, size, bytes),
        AttachmentKind::Docx => analyze_docx(filename, content_type, size, bytes),
        AttachmentKind::Unsupported => AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: "unsupported attachment type".into(),
            },
            turn_text_excerpt: None,
        },
    }
}

async fn analyze_image(llm: &LlmClient, filename: &str, content_type: &str, size: u64, bytes: &[u8]) -> AnalyzedAttachment {
    let prompt = "Describe this image in detail for someone who cannot see it.";
    match llm.vision(bytes, prompt, &VisionOptions::default()).await {
        Ok(description) => AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: truncate(&description, PREVIEW_LEN),
            },
            turn_text_excerpt: Some(format!("[Attached image \"{filename}\"]: {description}")),
        },
        Err(e) => AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: format!("vision analysis failed: {e}"),
            },
            turn_text_excerpt: None,
        },
    }
}

fn analyze_pdf(filename: &str, content_type: &str, size: u64, bytes: &[u8]) -> AnalyzedAttachment {
    match pdf_extract::extract_text_from_mem(bytes) {
        Ok(text) => {
            let truncated = truncate(&text, EXTRACTED_TEXT_TRUNCATE);
            AnalyzedAttachment {
                metadata: AttachmentMetadata {
                    filename: filename.to_string(),
                    content_type: content_type.to_string(),
                    size,
                    preview: truncate(&text, PREVIEW_LEN),
                },
                turn_text_excerpt: Some(format!("[Attached PDF \"{filename}\"]:\n{truncated}")),
            }
        }
        Err(e) => AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: format!("pdf text extraction failed: {e}"),
            },
            turn_text_excerpt: None,
        },
    }
}

fn analyze_docx(filename: &str, content_type: &str, size: u64, bytes: &[u8]) -> AnalyzedAttachment {
    match docx_rust::DocxFile::from_reader(std::io::Cursor::new(bytes)).and_then(|f| f.parse()) {
        Ok(docx) => {
            let text = docx
                .document
                .body
                .content
                .iter()
                .filter_map(|el| el.as_paragraph())
                .map(|p| p.text())
                .collect::<Vec<_>>()
                .join("\n");
            let truncated = truncate(&text, EXTRACTED_TEXT_TRUNCATE);
            AnalyzedAttachment {
                metadata: AttachmentMetadata {
                    filename: filename.to_string(),
                    content_type: content_type.to_string(),
                    size,
                    preview: truncate(&text, PREVIEW_LEN),
                },
                turn_text_excerpt: Some(format!("[Attached document \"{filename}\"]:\n{truncated}")),
            }
        }
        Err(e) => AnalyzedAttachment {
            metadata: AttachmentMetadata {
                filename: filename.to_string(),
                content_type: content_type.to_string(),
                size,
                preview: format!("docx paragraph extraction failed: {e}"),
            },
            turn_text_excerpt: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_mime_types() {
        assert_eq!(classify("image/png"), AttachmentKind::Image);
        assert_eq!(classify("application/pdf"), AttachmentKind::Pdf);
        assert_eq!(
            classify("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            AttachmentKind::Docx
        );
        assert_eq!(classify("application/zip"), AttachmentKind::Unsupported);
    }

    #[test]
    fn size_limit_is_ten_megabytes() {
        assert!(!exceeds_size_limit(10 * 1024 * 1024));
        assert!(exceeds_size_limit(10 * 1024 * 1024 + 1));
    }

    #[test]
    fn truncate_adds_ellipsis_only_when_needed() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcde...");
    }
}
