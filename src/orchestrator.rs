//! Front-to-back lifecycle of one scan: mode selection, argument building,
//! the scan itself with its status animation, and the analysis hand-off.

use std::io::BufRead;

use regex::Regex;
use tracing::{debug, warn};

use crate::animator::{StatusAnimator, TerminalSink};
use crate::args::{ArgumentBuilder, ArgumentList, Mode, ScanRequest};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::output::Console;
use crate::pipeline::{CommandRunner, ProcessResult};

/// Observable position in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    SelectMode,
    BuildArgs,
    Scanning,
    Analyzing,
    Done,
    Failed,
}

/// The target line as typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetInput {
    pub target: String,
    /// Set when the line carried the forced-defaults phrase
    pub forced_defaults: bool,
}

impl TargetInput {
    pub fn parse(raw: &str, phrase: &str) -> Result<Self> {
        let line = raw.trim();
        if line.is_empty() {
            return Err(Error::MissingTarget);
        }

        if !phrase.is_empty() {
            match Regex::new(&format!(r"^(?P<target>\S+)\s+{}$", regex::escape(phrase))) {
                Ok(pattern) => {
                    if let Some(target) = pattern.captures(line).and_then(|c| c.name("target")) {
                        return Ok(Self {
                            target: target.as_str().to_string(),
                            forced_defaults: true,
                        });
                    }
                }
                Err(e) => warn!(error = %e, "ignoring unusable forced-defaults phrase"),
            }
        }

        let mut tokens = line.split_whitespace();
        let target = tokens.next().ok_or(Error::MissingTarget)?.to_string();
        if tokens.next().is_some() {
            warn!(target = %target, "ignoring extra text after the target");
        }

        Ok(Self {
            target,
            forced_defaults: false,
        })
    }
}

enum Step {
    SelectMode(TargetInput),
    BuildArgs {
        request: ScanRequest,
        raw_flags: Option<String>,
    },
    Scanning(ArgumentList),
    Analyzing(ProcessResult),
    Done,
}

pub struct Orchestrator<R, I> {
    settings: Settings,
    runner: R,
    input: I,
    console: Console,
    stage: Stage,
}

impl<R, I> Orchestrator<R, I>
where
    R: CommandRunner,
    I: BufRead,
{
    pub fn new(settings: Settings, runner: R, input: I) -> Self {
        Self {
            settings,
            runner,
            input,
            console: Console,
            stage: Stage::Idle,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Drive one invocation to `Done`, or to `Failed` with the error that stopped it.
    pub async fn run(&mut self) -> Result<()> {
        let outcome = self.drive().await;
        self.stage = match outcome {
            Ok(()) => Stage::Done,
            Err(_) => Stage::Failed,
        };
        outcome
    }

    async fn drive(&mut self) -> Result<()> {
        let target = self.read_target()?;
        let mut step = Step::SelectMode(target);

        loop {
            step = match step {
                Step::SelectMode(target) => {
                    self.enter(Stage::SelectMode);
                    self.select_mode(target)?
                }
                Step::BuildArgs { request, raw_flags } => {
                    self.enter(Stage::BuildArgs);
                    let args = ArgumentBuilder::new(&self.settings.paths)
                        .build(&request, raw_flags.as_deref(), &self.runner)
                        .await?;
                    Step::Scanning(args)
                }
                Step::Scanning(args) => {
                    self.enter(Stage::Scanning);
                    Step::Analyzing(self.scan(&args).await?)
                }
                Step::Analyzing(scan) => {
                    self.enter(Stage::Analyzing);
                    let analysis = self.runner.run_analysis(&scan.combined_output).await?;
                    self.console.analysis_output(&analysis.combined_output);
                    Step::Done
                }
                Step::Done => {
                    self.console.success("Nmap processing complete.");
                    return Ok(());
                }
            };
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.stage, to = ?stage, "stage transition");
        self.stage = stage;
    }

    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line)
    }

    fn read_target(&mut self) -> Result<TargetInput> {
        self.console.prompt("Enter the target IP address:")?;
        let line = self.read_line()?;
        TargetInput::parse(&line, &self.settings.display.forced_defaults_phrase)
    }

    fn select_mode(&mut self, input: TargetInput) -> Result<Step> {
        if input.forced_defaults {
            self.console.info(&format!("Executing default Nmap series for: {}", input.target));
            return Ok(Step::BuildArgs {
                request: ScanRequest::new(input.target, Mode::Defaults),
                raw_flags: None,
            });
        }

        self.console.mode_menu();
        let mode = Mode::from_choice(&self.read_line()?)?;

        let raw_flags = match mode {
            Mode::Defaults => {
                self.console.success("Using default Nmap options.");
                None
            }
            Mode::Custom => {
                self.console.info("Enter your custom nmap flags:");
                let flags = self.read_line()?.trim().to_string();
                self.console.info(&format!("You entered: {}", flags));
                Some(flags)
            }
            Mode::Assisted => {
                self.console.success("Commander Cody is assisting you with flag selection...");
                None
            }
        };

        Ok(Step::BuildArgs {
            request: ScanRequest::new(input.target, mode),
            raw_flags,
        })
    }

    async fn scan(&self, args: &ArgumentList) -> Result<ProcessResult> {
        self.console.executing(&self.settings.tools.scan_binary, args);

        let animator = StatusAnimator::new(self.settings.display.status_interval(), TerminalSink::new()).spawn();
        let outcome = self.runner.run_scan(args).await;
        // The animator must be gone before anything else is printed.
        animator.stop().await;

        let scan = outcome?;
        self.console.info("Nmap scan complete. Passing data to analysis script...");
        Ok(scan)
    }
}
