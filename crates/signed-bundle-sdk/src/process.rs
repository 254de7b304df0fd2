//! External tool execution.
//!
//! The pipeline never spawns processes directly; it goes through
//! [`ProcessRunner`] so tests can substitute a recording fake and `--dry-run`
//! can log instead of executing.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::types::ExitOutcome;

/// A single external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInvocation {
    pub program: String,
    pub args: Vec<OsString>,
    pub cwd: PathBuf,
}

impl ProcessInvocation {
    pub fn new(program: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

impl fmt::Display for ProcessInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            let arg = arg.to_string_lossy();
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Runs external commands to completion.
pub trait ProcessRunner {
    /// Runs `invocation` and reports how it ended. An `Err` means the
    /// process could not be started.
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ExitOutcome>;
}

/// Runs commands for real with inherited stdin/stdout/stderr so tool output
/// streams live to the caller.
#[derive(Debug, Clone, Default)]
pub struct SystemProcessRunner {
    timeout: Option<Duration>,
}

impl SystemProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kills the child if it runs longer than `timeout`. Without a timeout
    /// a hung tool blocks forever.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ExitOutcome> {
        log::debug!("running `{}` in {}", invocation, invocation.cwd.display());

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()?;

        let status = match self.timeout {
            None => child.wait()?,
            Some(limit) => match child.wait_timeout(limit)? {
                Some(status) => status,
                None => {
                    log::error!(
                        "`{}` did not finish within {}s, killing it",
                        invocation.program,
                        limit.as_secs()
                    );
                    child.kill()?;
                    child.wait()?;
                    return Ok(ExitOutcome::TimedOut(limit));
                }
            },
        };

        Ok(outcome_from_status(status))
    }
}

fn outcome_from_status(status: ExitStatus) -> ExitOutcome {
    match status.code() {
        Some(code) => ExitOutcome::Exited(code),
        None => ExitOutcome::Signaled,
    }
}

/// Logs commands instead of running them and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunProcessRunner;

impl ProcessRunner for DryRunProcessRunner {
    fn run(&self, invocation: &ProcessInvocation) -> io::Result<ExitOutcome> {
        log::info!(
            "[dry-run] would run `{}` in {}",
            invocation,
            invocation.cwd.display()
        );
        Ok(ExitOutcome::Exited(0))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fake shared by the stage tests.

    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct FakeRunner {
        calls: RefCell<Vec<ProcessInvocation>>,
        outcomes: RefCell<VecDeque<io::Result<ExitOutcome>>>,
    }

    impl FakeRunner {
        /// Every call succeeds.
        pub fn succeeding() -> Self {
            Self::default()
        }

        /// Queues the result of the next unanswered call.
        pub fn then(self, outcome: io::Result<ExitOutcome>) -> Self {
            self.outcomes.borrow_mut().push_back(outcome);
            self
        }

        pub fn calls(&self) -> Vec<ProcessInvocation> {
            self.calls.borrow().clone()
        }
    }

    impl ProcessRunner for FakeRunner {
        fn run(&self, invocation: &ProcessInvocation) -> io::Result<ExitOutcome> {
            self.calls.borrow_mut().push(invocation.clone());
            self.outcomes
                .borrow_mut()
                .pop_front()
                .unwrap_or(Ok(ExitOutcome::Exited(0)))
        }
    }
}
