//! Reads the newline-separated directory list the crawler wrote.
//! Grounded in `JE/docfile.c`: blank and whitespace-only lines are
//! skipped, and each remaining line has its trailing whitespace trimmed.

use std::fs;
use std::path::Path;

use crate::error::IndexerError;

pub fn read_docfile(path: &Path) -> Result<Vec<String>, IndexerError> {
    let contents = fs::read_to_string(path)?;
    let dirs: Vec<String> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect();

    if dirs.is_empty() {
        return Err(IndexerError::EmptyDocfile { path: path.display().to_string() });
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn skips_blank_and_whitespace_only_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "/a\n\n   \n/b\n").unwrap();
        let dirs = read_docfile(file.path()).unwrap();
        assert_eq!(dirs, vec!["/a".to_owned(), "/b".to_owned()]);
    }

    #[test]
    fn empty_docfile_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(read_docfile(file.path()).is_err());
    }
}
