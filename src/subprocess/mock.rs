use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::events::{self, CommandEvent, EventSink};
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// In-process stand-in for [`TokioProcessRunner`](super::TokioProcessRunner).
///
/// Expectations are matched in registration order by program and an
/// optional argument predicate. Every call is recorded, and the same
/// lifecycle events the real runner emits are replayed to the caller's sink.
#[derive(Clone)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

enum MockFailure {
    Timeout(Duration),
    NotFound,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: ProcessOutput,
    failure: Option<MockFailure>,
    times_called: usize,
    expected_times: Option<usize>,
}

pub struct MockCommandConfig {
    runner: MockProcessRunner,
    expectation: MockExpectation,
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self {
            expectations: Arc::new(Mutex::new(Vec::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn expect_command(&mut self, program: &str) -> MockCommandConfig {
        MockCommandConfig {
            runner: self.clone(),
            expectation: MockExpectation {
                program: program.to_string(),
                args_matcher: None,
                response: ProcessOutput {
                    status: ExitStatus::Success,
                    stdout: String::new(),
                    stderr: String::new(),
                    duration: Duration::from_millis(10),
                },
                failure: None,
                times_called: 0,
                expected_times: None,
            },
        }
    }

    pub fn verify_called(&self, program: &str, times: usize) -> bool {
        let history = self.call_history.lock().unwrap();
        let count = history.iter().filter(|cmd| cmd.program == program).count();
        count == times
    }

    pub fn get_call_history(&self) -> Vec<ProcessCommand> {
        self.call_history.lock().unwrap().clone()
    }

    /// The most recent call, if any.
    pub fn last_call(&self) -> Option<ProcessCommand> {
        self.call_history.lock().unwrap().last().cloned()
    }

    pub fn reset(&mut self) {
        self.expectations.lock().unwrap().clear();
        self.call_history.lock().unwrap().clear();
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(
        &self,
        command: ProcessCommand,
        sink: Option<&EventSink>,
    ) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());
        events::emit(sink, CommandEvent::Command(command.command_line()));

        let response = {
            let mut expectations = self.expectations.lock().unwrap();
            let mut matched = None;

            for expectation in expectations.iter_mut() {
                if expectation.program != command.program {
                    continue;
                }

                if let Some(ref args_matcher) = expectation.args_matcher {
                    if !(args_matcher)(&command.args) {
                        continue;
                    }
                }

                expectation.times_called += 1;

                if let Some(expected) = expectation.expected_times {
                    if expectation.times_called > expected {
                        return Err(ProcessError::MockExpectationNotMet(format!(
                            "Command '{}' called {} times, expected {}",
                            command.program, expectation.times_called, expected
                        )));
                    }
                }

                matched = Some(match &expectation.failure {
                    None => Ok(expectation.response.clone()),
                    Some(MockFailure::Timeout(timeout)) => Err(ProcessError::Timeout {
                        command: command.command_line(),
                        timeout: *timeout,
                    }),
                    Some(MockFailure::NotFound) => {
                        Err(ProcessError::CommandNotFound(command.program.clone()))
                    }
                });
                break;
            }

            matched
        };

        match response {
            Some(Ok(output)) => {
                events::emit(sink, CommandEvent::Stdout(output.stdout.clone()));
                events::emit(sink, CommandEvent::Stderr(output.stderr.clone()));
                events::emit(sink, CommandEvent::Closed);
                Ok(output)
            }
            Some(Err(ProcessError::CommandNotFound(program))) => {
                Err(ProcessError::CommandNotFound(program))
            }
            Some(Err(err)) => {
                events::emit(sink, CommandEvent::Closed);
                Err(err)
            }
            None => Err(ProcessError::MockExpectationNotMet(format!(
                "No expectation found for command: {} {:?}",
                command.program, command.args
            ))),
        }
    }
}

impl MockCommandConfig {
    pub fn with_args<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.expectation.args_matcher = Some(Box::new(matcher));
        self
    }

    pub fn returns_stdout(mut self, stdout: &str) -> Self {
        self.expectation.response.stdout = stdout.to_string();
        self
    }

    pub fn returns_stderr(mut self, stderr: &str) -> Self {
        self.expectation.response.stderr = stderr.to_string();
        self
    }

    pub fn returns_exit_code(mut self, code: i32) -> Self {
        self.expectation.response.status = if code == 0 {
            ExitStatus::Success
        } else {
            ExitStatus::Error(code)
        };
        self
    }

    pub fn returns_success(self) -> Self {
        self.returns_exit_code(0)
    }

    /// Respond as if the process outlived `timeout`.
    pub fn times_out(mut self, timeout: Duration) -> Self {
        self.expectation.failure = Some(MockFailure::Timeout(timeout));
        self
    }

    /// Respond as if the executable does not exist.
    pub fn not_found(mut self) -> Self {
        self.expectation.failure = Some(MockFailure::NotFound);
        self
    }

    pub fn times(mut self, n: usize) -> Self {
        self.expectation.expected_times = Some(n);
        self
    }

    pub fn finish(self) {
        self.runner
            .expectations
            .lock()
            .unwrap()
            .push(self.expectation);
    }
}

impl Default for MockProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}
