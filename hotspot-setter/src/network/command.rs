/*!
 * External command invocation
 * Blocking spawn of OS network tools with captured output
 */

use std::process::Command;

use crate::error::{Error, Result};

/// Captured result of one external command run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Render exit code and both streams as one block of text for display.
    pub fn diagnostic(&self) -> String {
        let code = match self.code {
            Some(code) => code.to_string(),
            None => "terminated by signal".to_string(),
        };
        format!(
            "Return code: {}\nSTDOUT:\n{}\n\nSTDERR:\n{}",
            code,
            self.stdout.trim(),
            self.stderr.trim()
        )
    }
}

/// Run `program` with `args`, blocking until it exits.
///
/// Only a spawn failure is an error. A non-zero exit is reported through
/// [`CommandOutput::code`]. Output is decoded lossily, so tools that emit a
/// legacy code page still produce readable text.
pub fn run_command(program: &str, args: &[&str]) -> Result<CommandOutput> {
    tracing::debug!("Running {} {:?}", program, args);

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|source| Error::CommandSpawn {
            program: program.to_string(),
            source,
        })?;

    let result = CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    tracing::debug!("{} exited with {:?}", program, result.code);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_trims_streams() {
        let output = CommandOutput {
            code: Some(10),
            stdout: "  connecting...\n".to_string(),
            stderr: "\nError: No network with SSID 'x' found.\n".to_string(),
        };

        assert_eq!(
            output.diagnostic(),
            "Return code: 10\nSTDOUT:\nconnecting...\n\nSTDERR:\nError: No network with SSID 'x' found."
        );
        assert!(!output.success());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let err = run_command("hotspot-setter-no-such-tool", &["--version"]).unwrap_err();
        assert!(matches!(err, Error::CommandSpawn { .. }));
        assert!(err.to_string().contains("hotspot-setter-no-such-tool"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_streams() {
        let output = run_command("sh", &["-c", "echo out; echo err >&2; exit 3"]).unwrap();

        assert_eq!(output.code, Some(3));
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }
}
