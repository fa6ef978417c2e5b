use std::io;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, info};

use crate::args::ArgumentList;
use crate::config::ToolSettings;
use crate::error::{Error, Result};

const READ_CHUNK: usize = 4096;

/// Outcome of one child process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// stdout and stderr, interleaved in arrival order
    pub combined_output: String,
    /// Exit status description when the process did not succeed
    pub exit_error: Option<String>,
}

/// Launches the external tools the scan depends on.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the scan binary with the given arguments
    async fn run_scan(&self, args: &ArgumentList) -> Result<ProcessResult>;

    /// Run the analysis script with the scan output on its stdin
    async fn run_analysis(&self, input: &str) -> Result<ProcessResult>;

    /// Run the interactive flag-selection helper with inherited stdio
    async fn run_assistant(&self) -> Result<()>;
}

/// Runs the configured tools as real child processes.
pub struct SystemRunner {
    tools: ToolSettings,
}

impl SystemRunner {
    pub fn new(tools: ToolSettings) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run_scan(&self, args: &ArgumentList) -> Result<ProcessResult> {
        let program = &self.tools.scan_binary;
        let command = render(program, args.tokens());

        let result = execute(program, args.tokens(), None)
            .await
            .map_err(|e| Error::ScanExecution {
                command: command.clone(),
                reason: e.to_string(),
                output: String::new(),
            })?;

        match result.exit_error {
            Some(reason) => Err(Error::ScanExecution {
                command,
                reason,
                output: result.combined_output,
            }),
            None => Ok(result),
        }
    }

    async fn run_analysis(&self, input: &str) -> Result<ProcessResult> {
        let program = &self.tools.interpreter;
        let script_args = [self.tools.analysis_script.clone()];
        let command = render(program, &script_args);

        let result = execute(program, &script_args, Some(input.as_bytes()))
            .await
            .map_err(|e| Error::AnalysisExecution {
                command: command.clone(),
                reason: e.to_string(),
                output: String::new(),
            })?;

        match result.exit_error {
            Some(reason) => Err(Error::AnalysisExecution {
                command,
                reason,
                output: result.combined_output,
            }),
            None => Ok(result),
        }
    }

    async fn run_assistant(&self) -> Result<()> {
        let script = &self.tools.assistant_script;
        debug!(interpreter = %self.tools.interpreter, script = %script, "launching flag assistant");

        let status = Command::new(&self.tools.interpreter)
            .arg(script)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Error::AssistedIo(format!("error invoking {}: {}", script, e)))?;

        if !status.success() {
            return Err(Error::AssistedIo(format!("{} exited with {}", script, status)));
        }
        Ok(())
    }
}

fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a program to completion, optionally feeding `input` to its stdin.
///
/// stdout and stderr are drained concurrently into one buffer so that neither
/// pipe can fill up and stall the child. A non-zero exit is reported through
/// [`ProcessResult::exit_error`]; only launch and pipe failures are `Err`.
pub async fn execute(program: &str, args: &[String], input: Option<&[u8]>) -> io::Result<ProcessResult> {
    let started = Instant::now();
    debug!(program, args = %args.join(" "), "launching child process");

    let mut child = Command::new(program)
        .args(args)
        .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let feeder = match (child.stdin.take(), input) {
        (Some(mut stdin), Some(data)) => {
            let data = data.to_vec();
            Some(tokio::spawn(async move {
                let written = stdin.write_all(&data).await;
                // Closing stdin lets the child see EOF.
                drop(stdin);
                written
            }))
        }
        _ => None,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout was not captured"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stderr was not captured"))?;

    let combined = merge_streams(stdout, stderr).await?;
    let status = child.wait().await?;

    if let Some(feeder) = feeder {
        match feeder.await {
            // The child may exit without reading all of its input.
            Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
            Err(e) => return Err(io::Error::new(io::ErrorKind::Other, e)),
            _ => {}
        }
    }

    info!(
        program,
        status = %status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "child process finished"
    );

    Ok(ProcessResult {
        combined_output: String::from_utf8_lossy(&combined).into_owned(),
        exit_error: (!status.success()).then(|| status.to_string()),
    })
}

async fn merge_streams<O, E>(mut stdout: O, mut stderr: E) -> io::Result<Vec<u8>>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let mut combined = Vec::new();
    let mut out_buf = [0u8; READ_CHUNK];
    let mut err_buf = [0u8; READ_CHUNK];
    let (mut out_open, mut err_open) = (true, true);

    while out_open || err_open {
        tokio::select! {
            read = stdout.read(&mut out_buf), if out_open => match read? {
                0 => out_open = false,
                n => combined.extend_from_slice(&out_buf[..n]),
            },
            read = stderr.read(&mut err_buf), if err_open => match read? {
                0 => err_open = false,
                n => combined.extend_from_slice(&err_buf[..n]),
            },
        }
    }

    Ok(combined)
}
