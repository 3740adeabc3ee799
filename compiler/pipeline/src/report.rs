//! Outcome of a generation run.

use std::fmt;
use std::path::PathBuf;

use codegen::CodegenError;

/// A file whose unit could not be generated
#[derive(Debug)]
pub struct FileFailure {
    /// Input file name
    pub file: String,
    /// Why it failed
    pub error: CodegenError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}: {}", self.file, self.error) }
}

/// What a run produced
#[derive(Debug, Default)]
pub struct RunReport {
    /// Paths of written units, in target order
    pub written: Vec<PathBuf>,
    /// Targets with no bound method
    pub skipped: Vec<String>,
    /// Targets that failed on their own
    pub failures: Vec<FileFailure>,
}

impl RunReport {
    /// True when every target either produced a unit or was skipped
    pub fn is_success(&self) -> bool { self.failures.is_empty() }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} written, {} skipped, {} failed",
            self.written.len(),
            self.skipped.len(),
            self.failures.len()
        )
    }
}
