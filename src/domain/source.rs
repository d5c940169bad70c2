//! Validated references to a file at a revision of a hosted repository.

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::DomainError;

static REPOSITORY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("repository pattern"));

static REVISION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-/]+$").expect("revision pattern"));

/// One file at one revision of one repository, with every field already
/// checked for path-segment safety. Construction is the only validation
/// point; downstream URL building relies on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocator {
    repository: String,
    path: String,
    revision: String,
}

impl SourceLocator {
    pub fn new(repository: &str, path: &str, revision: &str) -> Result<Self, DomainError> {
        if !REPOSITORY_PATTERN.is_match(repository) {
            return Err(DomainError::validation(
                "repo must be `owner/name` using letters, digits, `_`, `.` or `-`",
            ));
        }
        if !REVISION_PATTERN.is_match(revision) {
            return Err(DomainError::validation(
                "ref must be a non-empty branch, tag or commit made of path-safe characters",
            ));
        }
        if path.is_empty() {
            return Err(DomainError::validation("path must not be empty"));
        }
        if path.contains('\0') {
            return Err(DomainError::validation("path must not contain NUL bytes"));
        }

        Ok(Self {
            repository: repository.to_string(),
            path: path.to_string(),
            revision: revision.to_string(),
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Final segment of the file path; the fallback document title.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_locator() {
        let locator = SourceLocator::new("octocat/Hello-World", "docs/README.md", "main")
            .expect("valid locator");
        assert_eq!(locator.repository(), "octocat/Hello-World");
        assert_eq!(locator.path(), "docs/README.md");
        assert_eq!(locator.revision(), "main");
    }

    #[test]
    fn rejects_repository_with_extra_slash() {
        assert!(SourceLocator::new("a/b/c", "README.md", "main").is_err());
    }

    #[test]
    fn rejects_repository_without_both_segments() {
        assert!(SourceLocator::new("/name", "README.md", "main").is_err());
        assert!(SourceLocator::new("owner/", "README.md", "main").is_err());
        assert!(SourceLocator::new("plain", "README.md", "main").is_err());
    }

    #[test]
    fn rejects_empty_revision() {
        assert!(SourceLocator::new("o/r", "README.md", "").is_err());
    }

    #[test]
    fn rejects_revision_with_spaces() {
        assert!(SourceLocator::new("o/r", "README.md", "release 1").is_err());
    }

    #[test]
    fn accepts_revision_with_slashes() {
        let locator =
            SourceLocator::new("o/r", "README.md", "feature/embed").expect("slashed revision");
        assert_eq!(locator.revision(), "feature/embed");
    }

    #[test]
    fn rejects_empty_path_and_nul_bytes() {
        assert!(SourceLocator::new("o/r", "", "main").is_err());
        assert!(SourceLocator::new("o/r", "READ\0ME.md", "main").is_err());
    }

    #[test]
    fn file_name_is_final_path_segment() {
        let nested = SourceLocator::new("o/r", "docs/guide/intro.md", "main").expect("nested");
        assert_eq!(nested.file_name(), "intro.md");

        let flat = SourceLocator::new("o/r", "README.md", "main").expect("flat");
        assert_eq!(flat.file_name(), "README.md");
    }
}
