//! Fuzz engine process runner.
//!
//! Launches the engine once per harness, captures stdout and stderr into a
//! single transcript, and enforces a wall-clock deadline. On expiry (or
//! cancellation) the child's whole process group is killed and the output
//! captured so far is kept.
//!
//! The runner never decides pass/fail. A completed run with a non-zero exit
//! code is still `Completed`; only a process that could not be started at
//! all is `LaunchFailed`.

use parking_lot::Mutex;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use invariant_fuzzer_types::RunOutcome;

/// How the engine binary is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    /// Arguments placed before the harness path, for wrappers such as
    /// `docker run --rm -v ... echidna`.
    pub prefix_args: Vec<String>,
}

impl EngineCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    pub fn with_prefix_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix_args = args.into_iter().map(Into::into).collect();
        self
    }
}

impl Default for EngineCommand {
    fn default() -> Self {
        Self::new("echidna")
    }
}

/// Arguments for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInvocation {
    pub harness_path: PathBuf,
    pub config_path: PathBuf,
    /// Contract the engine should fuzz.
    pub contract_name: String,
    pub corpus_dir: Option<PathBuf>,
    pub test_mode: Option<String>,
    pub format: String,
    pub working_dir: Option<PathBuf>,
}

impl EngineInvocation {
    pub fn new(
        harness_path: impl Into<PathBuf>,
        config_path: impl Into<PathBuf>,
        contract_name: impl Into<String>,
    ) -> Self {
        Self {
            harness_path: harness_path.into(),
            config_path: config_path.into(),
            contract_name: contract_name.into(),
            corpus_dir: None,
            test_mode: None,
            format: "text".to_string(),
            working_dir: None,
        }
    }

    pub fn with_corpus_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.corpus_dir = Some(dir.into());
        self
    }

    pub fn with_test_mode(mut self, mode: impl Into<String>) -> Self {
        self.test_mode = Some(mode.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// `<harness> --config <cfg> --format text --contract <name> [--corpus-dir <dir>] [--test-mode <mode>]`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            self.harness_path.display().to_string(),
            "--config".to_string(),
            self.config_path.display().to_string(),
            "--format".to_string(),
            self.format.clone(),
            "--contract".to_string(),
            self.contract_name.clone(),
        ];
        if let Some(dir) = &self.corpus_dir {
            args.push("--corpus-dir".to_string());
            args.push(dir.display().to_string());
        }
        if let Some(mode) = &self.test_mode {
            args.push("--test-mode".to_string());
            args.push(mode.clone());
        }
        args
    }
}

/// Runs the engine as a child process with a deadline.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    engine: EngineCommand,
    drain_grace: Duration,
}

impl ProcessRunner {
    /// How long to wait for output pipes to close after the child is gone.
    pub const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

    pub fn new(engine: EngineCommand) -> Self {
        Self {
            engine,
            drain_grace: Self::DEFAULT_DRAIN_GRACE,
        }
    }

    pub fn with_drain_grace(mut self, grace: Duration) -> Self {
        self.drain_grace = grace;
        self
    }

    /// Full argv, for logging and reports.
    pub fn command_line(&self, invocation: &EngineInvocation) -> Vec<String> {
        std::iter::once(self.engine.program.display().to_string())
            .chain(self.engine.prefix_args.iter().cloned())
            .chain(invocation.args())
            .collect()
    }

    pub async fn run(&self, invocation: &EngineInvocation, deadline: Duration) -> RunOutcome {
        self.run_until(invocation, deadline, &CancellationToken::new())
            .await
    }

    /// Run until exit, `deadline`, or `cancel`, whichever comes first.
    pub async fn run_until(
        &self,
        invocation: &EngineInvocation,
        deadline: Duration,
        cancel: &CancellationToken,
    ) -> RunOutcome {
        let mut command = Command::new(&self.engine.program);
        command
            .args(&self.engine.prefix_args)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &invocation.working_dir {
            command.current_dir(dir);
        }
        // Own process group, so a kill reaches everything the engine spawned.
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let cause = launch_cause(&self.engine.program, &e);
                warn!(contract = %invocation.contract_name, %cause, "engine launch failed");
                return RunOutcome::LaunchFailed { cause };
            }
        };
        let pid = child.id();
        info!(
            contract = %invocation.contract_name,
            pid = ?pid,
            deadline_secs = deadline.as_secs(),
            command = %self.command_line(invocation).join(" "),
            "engine started"
        );

        let transcript = Arc::new(Mutex::new(Vec::<u8>::new()));
        let mut readers: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(tokio::spawn(capture_lines(stdout, Arc::clone(&transcript))));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(tokio::spawn(capture_lines(stderr, Arc::clone(&transcript))));
        }

        let waited = tokio::select! {
            status = child.wait() => Some(status),
            _ = tokio::time::sleep(deadline) => None,
            _ = cancel.cancelled() => None,
        };

        // Leftover group members must not outlive the run either way.
        terminate(&mut child, pid).await;
        self.drain(&mut readers).await;
        let text = String::from_utf8_lossy(&transcript.lock()).into_owned();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        settle(waited, text, elapsed_ms, &invocation.contract_name, cancel.is_cancelled())
    }

    async fn drain(&self, readers: &mut [JoinHandle<()>]) {
        let drained = tokio::time::timeout(self.drain_grace, async {
            for handle in readers.iter_mut() {
                let _ = handle.await;
            }
        })
        .await
        .is_ok();
        if !drained {
            debug!("output pipes still open after grace period, abandoning readers");
            for handle in readers.iter() {
                handle.abort();
            }
        }
    }
}

/// Append whole lines to the shared transcript so the two streams
/// interleave at line granularity.
async fn capture_lines<R>(reader: R, sink: Arc<Mutex<Vec<u8>>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => sink.lock().extend_from_slice(&line),
        }
    }
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    if let Some(pid) = pid {
        kill_process_group(pid);
    }
    #[cfg(not(unix))]
    let _ = pid;
    // Kills the direct child if still running, then reaps it.
    let _ = child.kill().await;
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // The child leads its own group, so its pid is the group id. ESRCH just
    // means the group is already empty.
    unsafe {
        libc::killpg(pid as libc::pid_t, libc::SIGKILL);
    }
}

/// Outcome for a started engine. `waited` is `None` when the deadline or
/// cancellation won the race.
fn settle(
    waited: Option<io::Result<ExitStatus>>,
    transcript: String,
    elapsed_ms: u64,
    contract: &str,
    cancelled: bool,
) -> RunOutcome {
    match waited {
        Some(Ok(status)) => {
            info!(contract, exit_code = ?status.code(), elapsed_ms, "engine exited");
            RunOutcome::Completed {
                exit_code: status.code(),
                transcript,
            }
        }
        // The process group is already killed; keep what it printed.
        Some(Err(e)) => {
            warn!(contract, error = %e, elapsed_ms, "lost track of engine process, group killed");
            RunOutcome::TimedOut { transcript }
        }
        None => {
            warn!(
                contract,
                elapsed_ms,
                cancelled,
                "engine deadline reached, process group killed"
            );
            RunOutcome::TimedOut { transcript }
        }
    }
}

fn launch_cause(program: &Path, err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::NotFound => format!("engine binary `{}` not found", program.display()),
        io::ErrorKind::PermissionDenied => {
            format!("engine binary `{}` is not executable", program.display())
        }
        _ => format!("failed to launch engine `{}`: {}", program.display(), err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_args_order() {
        let inv = EngineInvocation::new("/w/invariant_1_test.sol", "/w/cfg.yaml", "EchidnaTest_1")
            .with_corpus_dir("/w/corpus")
            .with_test_mode("property");
        assert_eq!(
            inv.args(),
            vec![
                "/w/invariant_1_test.sol",
                "--config",
                "/w/cfg.yaml",
                "--format",
                "text",
                "--contract",
                "EchidnaTest_1",
                "--corpus-dir",
                "/w/corpus",
                "--test-mode",
                "property",
            ]
        );
    }

    #[test]
    fn test_command_line_includes_prefix() {
        let runner = ProcessRunner::new(
            EngineCommand::new("docker").with_prefix_args(["run", "--rm", "echidna"]),
        );
        let inv = EngineInvocation::new("h.sol", "c.yaml", "T");
        let argv = runner.command_line(&inv);
        assert_eq!(&argv[..4], &["docker", "run", "--rm", "echidna"]);
        assert_eq!(argv[4], "h.sol");
    }

    #[test]
    fn test_lost_child_keeps_transcript() {
        let outcome = settle(
            Some(Err(io::Error::other("ECHILD"))),
            "echidna_invariant_1: fuzzing\n".to_string(),
            12,
            "EchidnaTest_1",
            false,
        );
        assert_eq!(
            outcome,
            RunOutcome::TimedOut {
                transcript: "echidna_invariant_1: fuzzing\n".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_is_completed() {
        use std::os::unix::process::ExitStatusExt;
        let outcome = settle(
            Some(Ok(ExitStatus::from_raw(1 << 8))),
            "out".to_string(),
            5,
            "EchidnaTest_1",
            false,
        );
        assert_eq!(outcome.exit_code(), Some(1));
        assert_eq!(outcome.transcript(), "out");
    }

    #[test]
    fn test_launch_cause_messages() {
        let missing = io::Error::new(io::ErrorKind::NotFound, "nope");
        assert!(launch_cause(Path::new("echidna"), &missing).contains("not found"));
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert!(launch_cause(Path::new("echidna"), &denied).contains("not executable"));
    }
}
