//! Uploaded document previews appended to the outgoing prompt

use crate::types::UploadedFile;

pub const DEFAULT_PREVIEW_CHARS: usize = 2000;

const TRUNCATED_MARKER: &str = "[... truncated]";
const BINARY_MARKER: &str = "[binary content not shown]";

/// Render every uploaded file as a preview section. Empty when there are no files.
pub fn preview_block(files: &[UploadedFile], max_chars: usize) -> String {
    if files.is_empty() {
        return String::new();
    }

    let mut block = String::from("\n\nUPLOADED DOCUMENTS:");
    for file in files {
        let mime = if file.mime_type.is_empty() {
            "unknown type"
        } else {
            file.mime_type.as_str()
        };
        block.push_str(&format!(
            "\n\n--- {} ({}, {} bytes) ---\n",
            file.name, mime, file.size
        ));
        match file.text() {
            Some(text) => {
                let (preview, truncated) = truncate_chars(text, max_chars);
                block.push_str(preview);
                if truncated {
                    block.push('\n');
                    block.push_str(TRUNCATED_MARKER);
                }
            }
            None => block.push_str(BINARY_MARKER),
        }
    }
    block
}

/// First `max_chars` characters of `s`, and whether anything was cut
fn truncate_chars(s: &str, max_chars: usize) -> (&str, bool) {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => (&s[..idx], true),
        None => (s, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_file(name: &str, content: &str) -> UploadedFile {
        UploadedFile {
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
            size: content.len() as u64,
            content: Some(content.to_string()),
        }
    }

    #[test]
    fn test_no_files_no_block() {
        assert_eq!(preview_block(&[], 100), "");
    }

    #[test]
    fn test_short_file_included_whole() {
        let block = preview_block(&[text_file("notes.txt", "ship it friday")], 100);
        assert!(block.starts_with("\n\nUPLOADED DOCUMENTS:"));
        assert!(block.contains("--- notes.txt (text/plain, 14 bytes) ---"));
        assert!(block.contains("ship it friday"));
        assert!(!block.contains(TRUNCATED_MARKER));
    }

    #[test]
    fn test_long_file_truncated() {
        let content = "x".repeat(50);
        let block = preview_block(&[text_file("big.txt", &content)], 10);
        assert!(block.contains(&format!("{}\n{}", "x".repeat(10), TRUNCATED_MARKER)));
        assert!(!block.contains(&"x".repeat(11)));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let (preview, truncated) = truncate_chars("ééééé", 3);
        assert_eq!(preview, "ééé");
        assert!(truncated);

        let (preview, truncated) = truncate_chars("abc", 3);
        assert_eq!(preview, "abc");
        assert!(!truncated);
    }

    #[test]
    fn test_binary_file_marker() {
        let file = UploadedFile {
            name: "logo.png".to_string(),
            mime_type: "image/png".to_string(),
            size: 2048,
            content: Some("data:image/png;base64,iVBORw0KGgo=".to_string()),
        };
        let block = preview_block(&[file], 100);
        assert!(block.contains("--- logo.png (image/png, 2048 bytes) ---"));
        assert!(block.contains(BINARY_MARKER));
        assert!(!block.contains("base64"));
    }

    #[test]
    fn test_multiple_files_in_order() {
        let block = preview_block(&[text_file("a.md", "first"), text_file("b.md", "second")], 100);
        let a = block.find("a.md").unwrap();
        let b = block.find("b.md").unwrap();
        assert!(a < b);
    }
}
