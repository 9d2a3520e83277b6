//! Reads one crawled page, stripping HTML tags before feeding its words
//! into the trie. Grounded in `JE/textfile.c`.

use std::fs;
use std::path::Path;

use indextrie::Trie;

use crate::error::IndexerError;

pub struct FileIndex {
    pub path: String,
    pub lines: Vec<String>,
    pub bytes: usize,
    pub words: usize,
}

/// Strips `<...>` tags from a line, matching the original's inner loop:
/// an unterminated tag consumes the rest of the line.
fn strip_tags(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '<' {
            while i < chars.len() && chars[i] != '>' {
                i += 1;
            }
            if i < chars.len() {
                i += 1;
            }
            continue;
        }
        out.push(chars[i]);
        i += 1;
    }
    out
}

pub fn read_textfile(path: &Path, trie: &mut Trie) -> Result<FileIndex, IndexerError> {
    let content = fs::read_to_string(path)?;
    let filename = path.display().to_string();

    let mut lines = Vec::new();
    let mut bytes = 0;
    let mut words = 0;

    for (line_no, raw_line) in content.lines().enumerate() {
        let stripped = strip_tags(raw_line);
        // `.lines()` already stripped the trailing newline the original
        // counted before tokenizing, so add it back per line.
        bytes += stripped.len() + 1;

        if !stripped.trim().is_empty() {
            for word in stripped.split_whitespace() {
                trie.insert(word, &filename, line_no);
                words += 1;
            }
        }

        lines.push(stripped);
    }

    Ok(FileIndex { path: filename, lines, bytes, words })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn strips_html_tags_before_counting_words() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<p>hello <b>world</b></p>").unwrap();

        let mut trie = Trie::new();
        let index = read_textfile(file.path(), &mut trie).unwrap();

        assert_eq!(index.lines[0], "hello world");
        assert_eq!(index.words, 2);
        assert!(trie.find("hello").is_some());
        assert!(trie.find("world").is_some());
    }

    #[test]
    fn byte_count_includes_one_newline_per_line() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "hello world").unwrap();
        writeln!(file, "bye").unwrap();

        let mut trie = Trie::new();
        let index = read_textfile(file.path(), &mut trie).unwrap();
        assert_eq!(index.bytes, "hello world".len() + 1 + "bye".len() + 1);
    }

    #[test]
    fn blank_lines_contribute_no_words() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "   \nreal words here").unwrap();

        let mut trie = Trie::new();
        let index = read_textfile(file.path(), &mut trie).unwrap();
        assert_eq!(index.words, 3);
        assert_eq!(index.lines.len(), 2);
    }
}
