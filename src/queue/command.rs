//! Command Descriptors
//!
//! Validated argument lists for external commands. Validation happens at
//! construction time, so a malformed command can never reach the scheduler.

use std::fmt;

use crate::error::ExecError;

/// An immutable, validated command-line argument list.
///
/// The first element is the program to invoke; the remaining elements are
/// its arguments. The list must be non-empty and the program name must not
/// be blank.
///
/// # Example
///
/// ```
/// use batchpool::queue::CommandSpec;
///
/// let spec = CommandSpec::new(vec![
///     "samtools".to_string(),
///     "index".to_string(),
///     "sample1.bam".to_string(),
/// ]).unwrap();
///
/// assert_eq!(spec.program(), "samtools");
/// assert_eq!(spec.args(), &["index".to_string(), "sample1.bam".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    argv: Vec<String>,
}

impl CommandSpec {
    /// Validates and wraps an argument list.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError::Validation`] if the list is empty or the
    /// program name (first element) is blank.
    pub fn new(argv: Vec<String>) -> Result<Self, ExecError> {
        if argv.is_empty() {
            return Err(ExecError::validation("command must not be empty"));
        }
        if argv[0].trim().is_empty() {
            return Err(ExecError::validation(
                "command program name must not be blank",
            ));
        }
        Ok(Self { argv })
    }

    /// The program to invoke (first element of the argument list).
    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// The full argument list, program included.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Joins the argument list into a single line for shell-mode execution.
    ///
    /// Shell mode trades process isolation for shell features and is an
    /// explicit opt-in via
    /// [`RunOptions::with_shell`](crate::queue::RunOptions::with_shell).
    pub fn shell_line(&self) -> String {
        self.argv.join(" ")
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_command() {
        let spec = CommandSpec::new(argv(&["echo", "hello"])).unwrap();

        assert_eq!(spec.program(), "echo");
        assert_eq!(spec.args(), &["hello".to_string()]);
        assert_eq!(spec.argv().len(), 2);
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = CommandSpec::new(Vec::new());
        assert!(matches!(result, Err(ExecError::Validation(_))));
    }

    #[test]
    fn test_blank_program_rejected() {
        let result = CommandSpec::new(argv(&["  ", "arg"]));
        assert!(matches!(result, Err(ExecError::Validation(_))));
    }

    #[test]
    fn test_single_element_command() {
        let spec = CommandSpec::new(argv(&["ls"])).unwrap();
        assert_eq!(spec.program(), "ls");
        assert!(spec.args().is_empty());
    }

    #[test]
    fn test_shell_line_joins_arguments() {
        let spec = CommandSpec::new(argv(&["echo", "a", "b"])).unwrap();
        assert_eq!(spec.shell_line(), "echo a b");
    }

    #[test]
    fn test_display_matches_shell_line() {
        let spec = CommandSpec::new(argv(&["fastqc", "s1.fastq"])).unwrap();
        assert_eq!(spec.to_string(), "fastqc s1.fastq");
    }
}
