//! Candidate discovery: PDF files in a folder become candidates.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use ranker_core::{Candidate, Document, DocumentError};

/// PDF files directly inside `dir`, sorted by file name.
///
/// Matching is on a case-insensitive `.pdf` suffix; subdirectories are
/// ignored and symlinks are followed.
pub fn discover_pdfs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase().ends_with(".pdf"))
            .unwrap_or(false);
        if is_pdf {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Load one PDF as a candidate: id is the path, name the file name.
pub fn load_candidate(path: &Path) -> Result<Candidate, DocumentError> {
    let document = Document::from_reader(File::open(path)?)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!(path = %path.display(), bytes = document.len(), "Loaded document");
    Ok(Candidate::from_document(path.display().to_string(), name, &document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discovers_pdfs_sorted_case_insensitive() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(dir.path().join("zoe.pdf"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("Adam.PDF"), b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = discover_pdfs(dir.path()).unwrap();
        assert_eq!(file_names(&found), vec!["Adam.PDF", "zoe.pdf"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_pdf_is_discovered() {
        let store = TempDir::new().expect("Failed to create temp dir");
        let target = store.path().join("original.pdf");
        std::fs::write(&target, b"%PDF-1.4\nbody").unwrap();

        let dir = TempDir::new().expect("Failed to create temp dir");
        std::os::unix::fs::symlink(&target, dir.path().join("linked.pdf")).unwrap();
        std::os::unix::fs::symlink(store.path(), dir.path().join("folder.pdf")).unwrap();

        let found = discover_pdfs(dir.path()).unwrap();
        assert_eq!(file_names(&found), vec!["linked.pdf"]);
        assert_eq!(load_candidate(&found[0]).unwrap().name, "linked.pdf");
    }

    #[test]
    fn test_missing_folder_is_error() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        assert!(discover_pdfs(&dir.path().join("does-not-exist")).is_err());
    }

    #[test]
    fn test_load_candidate() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let good = dir.path().join("jane.pdf");
        std::fs::write(&good, b"%PDF-1.7\nbody").unwrap();
        let bad = dir.path().join("fake.pdf");
        std::fs::write(&bad, b"not a pdf").unwrap();

        let candidate = load_candidate(&good).unwrap();
        assert_eq!(candidate.name, "jane.pdf");
        assert_eq!(candidate.id, good.display().to_string());
        assert!(candidate.profile["pdf_preview"]
            .as_str()
            .unwrap()
            .starts_with("255044462d"));

        assert!(matches!(load_candidate(&bad), Err(DocumentError::InvalidHeader)));
    }
}
