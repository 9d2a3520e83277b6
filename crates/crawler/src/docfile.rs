//! Saves crawled pages under `save_dir`, mirroring the URL's path, and
//! maintains the docfile: a newline-separated list of every distinct
//! absolute directory that now holds at least one saved page. The
//! indexer coordinator reads this file to learn which directories to
//! shard across its workers.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::parse::PageUrl;

pub struct Docfile {
    file: Mutex<File>,
    known: Mutex<HashSet<PathBuf>>,
}

impl Docfile {
    /// Creates (truncating) the docfile at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).write(true).truncate(true).open(path)?;
        Ok(Docfile { file: Mutex::new(file), known: Mutex::new(HashSet::new()) })
    }

    /// Appends `dir` (as an absolute path) the first time it is seen.
    pub fn record_dir(&self, dir: &Path) -> io::Result<()> {
        let absolute = if dir.is_absolute() { dir.to_path_buf() } else { std::env::current_dir()?.join(dir) };

        let mut known = self.known.lock().unwrap();
        if known.contains(&absolute) {
            return Ok(());
        }

        let mut file = self.file.lock().unwrap();
        writeln!(file, "{}", absolute.display())?;
        file.flush()?;
        known.insert(absolute);
        Ok(())
    }
}

/// Maps a crawled URL to a path under `save_dir`: the host becomes the
/// top directory, and the URL path becomes the rest, with `index.html`
/// substituted for a path ending in `/`.
pub fn page_path(save_dir: &Path, url: &PageUrl) -> PathBuf {
    let mut path = save_dir.join(&url.host);
    let trimmed = url.path.trim_start_matches('/');
    if trimmed.is_empty() || url.path.ends_with('/') {
        path = path.join(trimmed).join("index.html");
    } else {
        path = path.join(trimmed);
    }
    path
}

/// Writes `body` to the path `page_path` would compute for `url`,
/// creating any missing parent directories and registering each newly
/// created directory in `docfile`.
pub fn save_page(save_dir: &Path, url: &PageUrl, body: &[u8], docfile: &Docfile) -> io::Result<PathBuf> {
    let dest = page_path(save_dir, url);
    if let Some(parent) = dest.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
            docfile.record_dir(parent)?;
        }
    }
    fs::write(&dest, body)?;
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn saving_a_page_creates_directories_and_records_them_once() {
        let tmp = tempdir().unwrap();
        let save_dir = tmp.path().join("pages");
        let docfile_path = tmp.path().join("docfile.txt");
        let docfile = Docfile::create(&docfile_path).unwrap();

        let url = PageUrl::parse("http://example.com/docs/page.html").unwrap();
        save_page(&save_dir, &url, b"<html></html>", &docfile).unwrap();

        let url2 = PageUrl::parse("http://example.com/docs/other.html").unwrap();
        save_page(&save_dir, &url2, b"<html></html>", &docfile).unwrap();

        let contents = fs::read_to_string(&docfile_path).unwrap();
        assert_eq!(contents.lines().count(), 1);
    }

    #[test]
    fn root_url_saves_as_index_html() {
        let tmp = tempdir().unwrap();
        let url = PageUrl::parse("http://example.com/").unwrap();
        let path = page_path(tmp.path(), &url);
        assert_eq!(path.file_name().unwrap(), "index.html");
    }
}
