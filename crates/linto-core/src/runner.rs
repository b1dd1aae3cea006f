//! External command execution.
//!
//! Every docker/kubectl/helm/mkcert invocation goes through `CommandRunner`
//! so timeouts and command echo are applied uniformly. Echo is an explicit
//! setting on the runner, threaded down from the CLI, not a process-wide
//! toggle.

use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::{DeployError, Result};

#[derive(Debug, Clone, Default)]
pub struct CommandRunner {
    echo: bool,
}

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Kill the child and fail after this long.
    pub timeout: Option<Duration>,
    /// Capture stdout/stderr instead of inheriting the terminal.
    pub capture: bool,
    pub cwd: Option<PathBuf>,
}

impl RunOptions {
    pub fn capture() -> Self {
        RunOptions {
            capture: true,
            ..RunOptions::default()
        }
    }

    pub fn capture_with_timeout(timeout: Duration) -> Self {
        RunOptions {
            capture: true,
            timeout: Some(timeout),
            ..RunOptions::default()
        }
    }

    pub fn inherit() -> Self {
        RunOptions::default()
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Quote an argument for display if it contains spaces or shell metacharacters.
fn quote_arg(arg: &str) -> String {
    if arg.contains(' ') || arg.chars().any(|c| matches!(c, '\'' | '"' | '$' | '\\')) {
        format!("'{}'", arg.replace('\'', "'\\''"))
    } else {
        arg.to_string()
    }
}

fn display_command(argv: &[&str]) -> String {
    argv.iter().map(|a| quote_arg(a)).collect::<Vec<_>>().join(" ")
}

impl CommandRunner {
    pub fn new(echo: bool) -> Self {
        CommandRunner { echo }
    }

    pub fn echo_enabled(&self) -> bool {
        self.echo
    }

    /// Run a command to completion.
    ///
    /// A missing binary surfaces as `PrerequisiteMissing`; a timeout kills
    /// the child and surfaces as an external tool failure.
    pub fn run(&self, argv: &[&str], opts: &RunOptions) -> Result<CmdOutput> {
        let rendered = display_command(argv);
        if self.echo {
            eprintln!("$ {rendered}");
        }
        tracing::debug!(command = %rendered, "running external command");

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| DeployError::external("COMMAND_FAILED", "empty command"))?;

        let mut command = Command::new(program);
        command.args(args);
        if let Some(cwd) = &opts.cwd {
            command.current_dir(cwd);
        }
        if opts.capture {
            command.stdout(Stdio::piped()).stderr(Stdio::piped());
        }

        let mut child = command.spawn().map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                DeployError::PrerequisiteMissing(format!("{program} not found"))
            } else {
                DeployError::Io(err)
            }
        })?;

        // Drain pipes on background threads so a chatty child cannot fill a
        // pipe buffer and deadlock against our wait loop.
        let stdout_reader = child.stdout.take().map(spawn_reader);
        let stderr_reader = child.stderr.take().map(spawn_reader);

        let status = match opts.timeout {
            None => child.wait()?,
            Some(timeout) => {
                let started = Instant::now();
                loop {
                    if let Some(status) = child.try_wait()? {
                        break status;
                    }
                    if started.elapsed() >= timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(DeployError::external(
                            "COMMAND_TIMEOUT",
                            format!("`{rendered}` timed out after {}s", timeout.as_secs()),
                        ));
                    }
                    std::thread::sleep(Duration::from_millis(50));
                }
            }
        };

        let stdout = join_reader(stdout_reader);
        let stderr = join_reader(stderr_reader);

        Ok(CmdOutput {
            status: status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }

    /// Run and fail on non-zero exit, attaching captured stderr.
    pub fn run_checked(&self, argv: &[&str], opts: &RunOptions, code: &'static str) -> Result<CmdOutput> {
        let output = self.run(argv, opts)?;
        if !output.success() {
            let mut message = format!("`{}` exited with code {}", display_command(argv), output.status);
            let stderr = output.stderr.trim();
            if !stderr.is_empty() {
                message.push_str(": ");
                message.push_str(stderr);
            }
            return Err(DeployError::external(code, message));
        }
        Ok(output)
    }
}

fn spawn_reader<R: Read + Send + 'static>(mut source: R) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        let _ = source.read_to_string(&mut buffer);
        buffer
    })
}

fn join_reader(handle: Option<std::thread::JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_arg_passes_plain_args_through() {
        assert_eq!(quote_arg("--wait"), "--wait");
        assert_eq!(quote_arg("has space"), "'has space'");
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn test_missing_binary_is_a_prerequisite_error() {
        let runner = CommandRunner::new(false);
        let err = runner
            .run(&["definitely-not-a-real-binary-zz"], &RunOptions::capture())
            .unwrap_err();
        assert_eq!(err.code(), "PREREQUISITES_MISSING");
    }

    #[test]
    fn test_captures_stdout() {
        let runner = CommandRunner::new(false);
        let output = runner.run(&["echo", "hello"], &RunOptions::capture()).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_timeout_kills_the_child() {
        let runner = CommandRunner::new(false);
        let err = runner
            .run(
                &["sleep", "5"],
                &RunOptions::capture_with_timeout(Duration::from_millis(100)),
            )
            .unwrap_err();
        assert_eq!(err.code(), "COMMAND_TIMEOUT");
    }
}
