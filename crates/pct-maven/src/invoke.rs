//! Build invocation: command line construction and process supervision.
//!
//! The build tool writes stdout and stderr through two pipes. Both are drained
//! on their own threads into one shared sink for as long as the process runs;
//! a build whose output outgrows the OS pipe buffer would otherwise block
//! forever on a write while we block on its exit.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::MavenError;
use crate::scan::OutputScanner;

/// How often a cancellable wait checks the token.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared flag that interrupts a running build.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a build produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Exit code, `None` when the process was killed by a signal.
    pub exit_status: Option<i32>,
    /// Modules the build reported as finished successfully, in build order.
    pub succeeded_plugin_ids: Vec<String>,
    pub warnings: Vec<String>,
    /// Error lines reported by the build.
    pub failures: Vec<String>,
}

impl BuildOutcome {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    /// Format a human-readable summary of the build result.
    pub fn summary(&self) -> String {
        if self.success() {
            let warnings = self.warnings.len();
            if warnings > 0 {
                format!("build succeeded with {warnings} warning(s)")
            } else {
                "build succeeded".to_owned()
            }
        } else {
            format!("build failed with {} error(s)", self.failures.len())
        }
    }
}

/// Runs the build tool for one plugin.
#[derive(Debug, Clone)]
pub struct MavenRunner {
    executable: PathBuf,
    settings_file: Option<PathBuf>,
    extra_args: Vec<String>,
    cancel: Option<CancelToken>,
}

impl MavenRunner {
    /// A runner launching `executable` (see [`crate::detect::resolve_executable`]).
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
            settings_file: None,
            extra_args: Vec::new(),
            cancel: None,
        }
    }

    /// Pass a settings file with `-s`.
    pub fn settings_file(mut self, path: &Path) -> Self {
        self.settings_file = Some(path.to_path_buf());
        self
    }

    /// Fixed arguments appended after the properties on every run.
    pub fn extra_args(mut self, args: &[String]) -> Self {
        self.extra_args = args.to_vec();
        self
    }

    /// Make running builds interruptible through `token`.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the argument list without executing.
    ///
    /// Order: settings file, `-Dkey=value` properties (sorted by key), fixed
    /// extra arguments, module selection, then the tasks.
    pub fn build_args(
        &self,
        properties: &BTreeMap<String, String>,
        module: Option<&str>,
        tasks: &[String],
    ) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(settings) = &self.settings_file {
            args.push("-s".to_owned());
            args.push(settings.display().to_string());
        }

        for (key, value) in properties {
            args.push(format!("-D{key}={value}"));
        }

        args.extend(self.extra_args.iter().cloned());

        if let Some(module) = module {
            args.push("-pl".to_owned());
            args.push(module.to_owned());
        }

        args.extend(tasks.iter().cloned());
        args
    }

    fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.executable.display().to_string())
            .chain(args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the build and wait for it.
    ///
    /// Combined output goes to `build_log` (created or truncated) or is
    /// discarded when no log is given. The log is flushed and closed before
    /// this returns, on every path.
    ///
    /// # Errors
    /// - `MavenError::LogFile` if the log cannot be created or written
    /// - `MavenError::Launch` if the process cannot be started
    /// - `MavenError::BuildFailed` on a non-zero exit, carrying the outcome
    /// - `MavenError::Interrupted` if the cancel token fired
    pub fn run(
        &self,
        properties: &BTreeMap<String, String>,
        working_directory: &Path,
        module: Option<&str>,
        build_log: Option<&Path>,
        tasks: &[String],
    ) -> Result<BuildOutcome, MavenError> {
        let args = self.build_args(properties, module, tasks);
        let command = self.command_line(&args);
        log::info!("running `{command}` in {}", working_directory.display());

        let writer: Box<dyn Write + Send> = match build_log {
            Some(path) => {
                let file = File::create(path).map_err(|source| MavenError::LogFile {
                    path: path.to_path_buf(),
                    source,
                })?;
                Box::new(BufWriter::new(file))
            }
            None => Box::new(std::io::sink()),
        };
        let sink = Arc::new(Mutex::new(Sink {
            writer,
            scanner: OutputScanner::new(),
            error: None,
        }));

        let mut cmd = Command::new(&self.executable);
        cmd.args(&args)
            .current_dir(working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so cancellation reaches forked JVMs too.
            cmd.process_group(0);
        }
        let mut child = cmd.spawn().map_err(|source| MavenError::Launch {
            command: command.clone(),
            directory: working_directory.to_path_buf(),
            source,
        })?;

        let mut drains = Vec::new();
        if let Some(pipe) = child.stdout.take() {
            let sink = Arc::clone(&sink);
            drains.push(thread::spawn(move || drain(pipe, &sink)));
        }
        if let Some(pipe) = child.stderr.take() {
            let sink = Arc::clone(&sink);
            drains.push(thread::spawn(move || drain(pipe, &sink)));
        }
        let status = match wait_for(&mut child, self.cancel.as_ref()) {
            Wait::Exited(status) => status,
            Wait::Cancelled => {
                // A descendant outside the group may still hold the pipes.
                // Close the log now and leave the drains to discard until EOF.
                let (_, flushed) = close_sink(&sink);
                if let Err(e) = flushed {
                    log::warn!("cannot flush build log of cancelled build: {e}");
                }
                return Err(MavenError::Interrupted {
                    command,
                    directory: working_directory.to_path_buf(),
                });
            }
            Wait::Failed(source) => {
                if let (_, Err(e)) = close_sink(&sink) {
                    log::warn!("cannot flush build log: {e}");
                }
                return Err(MavenError::Supervise { command, source });
            }
        };

        // The drains end at EOF, i.e. once every process holding the pipes
        // has exited.
        for handle in drains {
            if handle.join().is_err() {
                log::warn!("build output reader panicked");
            }
        }
        let (Sink { scanner, error, .. }, flushed) = close_sink(&sink);
        let log_error = |source| MavenError::LogFile {
            path: build_log.map(Path::to_path_buf).unwrap_or_default(),
            source,
        };
        if let Some(source) = error {
            return Err(log_error(source));
        }
        flushed.map_err(log_error)?;

        let outcome = BuildOutcome {
            exit_status: status.code(),
            succeeded_plugin_ids: scanner.succeeded,
            warnings: scanner.warnings,
            failures: scanner.errors,
        };
        log::debug!("{}: {}", command, outcome.summary());

        if !status.success() {
            return Err(MavenError::BuildFailed {
                command,
                directory: working_directory.to_path_buf(),
                exit_code: status.code(),
                outcome: Box::new(outcome),
            });
        }
        Ok(outcome)
    }
}

struct Sink {
    writer: Box<dyn Write + Send>,
    scanner: OutputScanner,
    /// First write failure; later lines are still read so the process never blocks.
    error: Option<std::io::Error>,
}

enum Wait {
    Exited(ExitStatus),
    Cancelled,
    Failed(std::io::Error),
}

/// Flush and close the log, taking what was collected so far. Later output is
/// discarded.
fn close_sink(sink: &Mutex<Sink>) -> (Sink, std::io::Result<()>) {
    let mut guard = sink.lock().unwrap_or_else(PoisonError::into_inner);
    let flushed = guard.writer.flush();
    let closed = std::mem::replace(
        &mut *guard,
        Sink {
            writer: Box::new(std::io::sink()),
            scanner: OutputScanner::new(),
            error: None,
        },
    );
    (closed, flushed)
}

/// Copy one pipe into the sink line by line until EOF.
fn drain<R: Read>(pipe: R, sink: &Mutex<Sink>) {
    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
                if sink.error.is_none() {
                    if let Err(e) = sink.writer.write_all(&line) {
                        sink.error = Some(e);
                    }
                }
                let text = String::from_utf8_lossy(&line);
                sink.scanner.feed(text.trim_end_matches(['\r', '\n']));
            }
            Err(e) => {
                log::warn!("stopped reading build output: {e}");
                break;
            }
        }
    }
}

/// Wait for exit, killing the process if the token fires first.
fn wait_for(child: &mut Child, cancel: Option<&CancelToken>) -> Wait {
    let Some(cancel) = cancel else {
        return child.wait().map_or_else(Wait::Failed, Wait::Exited);
    };
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Wait::Exited(status),
            Ok(None) => {}
            Err(e) => return Wait::Failed(e),
        }
        if cancel.is_cancelled() {
            kill_group(child);
            if let Err(e) = child.kill() {
                log::warn!("cannot kill cancelled build: {e}");
            }
            // Reap so the pipes close and the drains can finish.
            let _ = child.wait();
            return Wait::Cancelled;
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill every process in the build's group.
#[cfg(unix)]
fn kill_group(child: &Child) {
    let group = format!("-{}", child.id());
    let killed = Command::new("kill")
        .args(["-KILL", "--", &group])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
    match killed {
        Ok(status) if status.success() => {}
        Ok(status) => log::warn!("cannot kill process group {group}: kill exited with {status}"),
        Err(e) => log::warn!("cannot kill process group {group}: {e}"),
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}
