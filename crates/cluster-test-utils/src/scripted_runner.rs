//! Scripted stand-in for the cluster command-line tools.
//!
//! Each rule matches invocations whose rendered command line contains a
//! substring and replays a queue of replies. The last reply of a rule repeats
//! forever, so "fail twice, then succeed" is `[fail, fail, ok]`.

use cluster_client::{CommandOutput, CommandRunner, Invocation, RunnerError};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// Canned result for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command ran and exited with `exit_code`.
    Exit {
        stdout: String,
        stderr: String,
        exit_code: i32,
    },
    /// The command hit its deadline.
    TimedOut,
}

/// Successful command printing `stdout`.
pub fn ok(stdout: impl Into<String>) -> Reply {
    Reply::Exit {
        stdout: stdout.into(),
        stderr: String::new(),
        exit_code: 0,
    }
}

/// Failed command with `exit_code` and `stderr`.
pub fn fail(exit_code: i32, stderr: impl Into<String>) -> Reply {
    Reply::Exit {
        stdout: String::new(),
        stderr: stderr.into(),
        exit_code,
    }
}

/// Command killed at its deadline.
pub fn timed_out() -> Reply {
    Reply::TimedOut
}

#[derive(Debug)]
struct Rule {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Replays scripted replies and records every invocation.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Invocation>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. Rules are tried in insertion order; the first whose
    /// pattern occurs in the command line answers.
    pub fn on<I>(self, pattern: &str, replies: I) -> Self
    where
        I: IntoIterator<Item = Reply>,
    {
        let replies: VecDeque<Reply> = replies.into_iter().collect();
        assert!(!replies.is_empty(), "rule for {pattern:?} needs at least one reply");

        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            replies,
        });
        self
    }

    /// Every invocation seen so far, in order.
    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of invocations whose command line contains `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.to_string().contains(pattern))
            .count()
    }

    fn next_reply(&self, command_line: &str) -> Option<Reply> {
        let mut rules = self.rules.lock().unwrap();
        let rule = rules
            .iter_mut()
            .find(|rule| command_line.contains(&rule.pattern))?;

        if rule.replies.len() > 1 {
            rule.replies.pop_front()
        } else {
            rule.replies.front().cloned()
        }
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, invocation: &Invocation) -> Result<CommandOutput, RunnerError> {
        self.calls.lock().unwrap().push(invocation.clone());
        let command_line = invocation.to_string();

        match self.next_reply(&command_line) {
            Some(Reply::Exit {
                stdout,
                stderr,
                exit_code,
            }) => Ok(CommandOutput {
                stdout,
                stderr,
                exit_code: Some(exit_code),
            }),
            Some(Reply::TimedOut) => Err(RunnerError::TimedOut {
                program: invocation.program.clone(),
                timeout: Duration::from_secs(30),
            }),
            None => Ok(CommandOutput {
                stdout: String::new(),
                stderr: format!("no scripted reply for `{command_line}`"),
                exit_code: Some(127),
            }),
        }
    }
}
