//! Subprocess-backed payload provider (out-of-core collaborator, spec.md §9).
//!
//! Runs the process once at startup and treats its stdout as the
//! payload, the same contract as the original's `ProcessPayloadProvider`
//! (`original_source/payload_provider/process_payload_provider.go`).

use crate::collab::PayloadProvider;
use crate::errors::{BlastError, Result};
use std::process::Command;

pub struct ProcessPayloadProvider {
    content: Vec<u8>,
}

impl ProcessPayloadProvider {
    pub fn new(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| BlastError::Config("payload process command is empty".to_string()))?;

        let output = Command::new(program).args(parts).output().map_err(|source| {
            BlastError::Config(format!("failed to run payload process '{command_line}': {source}"))
        })?;

        if !output.status.success() {
            return Err(BlastError::Config(format!(
                "payload process '{command_line}' exited with {}",
                output.status
            )));
        }

        Ok(Self {
            content: output.stdout,
        })
    }
}

impl PayloadProvider for ProcessPayloadProvider {
    fn get(&self) -> Vec<u8> {
        self.content.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_stdout_of_successful_process() {
        let provider = ProcessPayloadProvider::new("echo -n HelloWorld").unwrap();
        assert_eq!(provider.get(), b"HelloWorld");
    }

    #[test]
    fn nonzero_exit_is_a_config_error() {
        let err = ProcessPayloadProvider::new("false").unwrap_err();
        assert!(matches!(err, BlastError::Config(_)));
    }
}
