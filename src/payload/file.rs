//! File-backed payload provider (out-of-core collaborator, spec.md §9).
//!
//! Reads the file once at startup and hands the bytes to a
//! [`super::ConstantPayloadGenerator`] — acquisition never happens on
//! the hot loop.

use crate::collab::PayloadProvider;
use crate::errors::{BlastError, Result};
use std::path::Path;

pub struct FilePayloadProvider {
    content: Vec<u8>,
}

impl FilePayloadProvider {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path).map_err(|source| {
            BlastError::Config(format!(
                "failed to read payload file {}: {source}",
                path.display()
            ))
        })?;
        Ok(Self { content })
    }
}

impl PayloadProvider for FilePayloadProvider {
    fn get(&self) -> Vec<u8> {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_file_contents_once() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"HelloWorld").unwrap();

        let provider = FilePayloadProvider::new(file.path()).unwrap();
        assert_eq!(provider.get(), b"HelloWorld");
        assert_eq!(provider.get(), b"HelloWorld");
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = FilePayloadProvider::new("/nonexistent/path/blast-payload").unwrap_err();
        assert!(matches!(err, BlastError::Config(_)));
    }
}
