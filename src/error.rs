use std::path::PathBuf;

/// Everything that can end an invocation early.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid option selected: '{0}' (expected 1, 2 or 3)")]
    InvalidSelection(String),

    #[error("No target provided")]
    MissingTarget,

    #[error("No entry found for keys {keys:?}: {reason}")]
    NotFound { keys: Vec<String>, reason: String },

    #[error("Failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("'{key}' key is missing or malformed")]
    MissingKey { key: String },

    #[error("Flag entry #{index} is malformed: {reason}")]
    MalformedEntry { index: usize, reason: String },

    #[error("Assisted selection failed: {0}")]
    AssistedIo(String),

    #[error("Nmap execution failed ({command}): {reason}\nOutput: {output}")]
    ScanExecution {
        command: String,
        reason: String,
        output: String,
    },

    #[error("Analysis script execution failed ({command}): {reason}\nOutput: {output}")]
    AnalysisExecution {
        command: String,
        reason: String,
        output: String,
    },

    #[error("Error reading input: {0}")]
    Input(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_errors_carry_output() {
        let err = Error::ScanExecution {
            command: "nmap -sV 10.0.0.1".to_string(),
            reason: "exit status: 1".to_string(),
            output: "Failed to resolve".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("nmap -sV 10.0.0.1"));
        assert!(message.contains("Failed to resolve"));
    }
}
