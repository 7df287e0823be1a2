use log::{debug, warn};
use std::ffi::CString;
use std::fs::OpenOptions;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, fork, ForkResult, Pid};

use crate::shell::builtins;
use crate::shell::error::ShellError;
use crate::shell::parser::ast::{Command, Pipeline, Redirection};
use crate::shell::parser::lexer::RedirectOp;

const STDIN: RawFd = 0;
const STDOUT: RawFd = 1;

/// Exit status of a child whose program was not found.
const STATUS_NOT_FOUND: i32 = 127;
/// Exit status of a child whose exec failed for any other reason.
const STATUS_EXEC_FAILED: i32 = 126;

#[derive(Default)]
pub struct Executor;

impl Executor {
    pub fn new() -> Self {
        Self
    }

    /// Runs one parsed pipeline and returns its exit status.
    ///
    /// A lone builtin runs in this process, so `cd` can move the shell
    /// itself and `exit` can end the session. Everything else forks.
    pub fn execute(&self, pipeline: &Pipeline) -> Result<i32, ShellError> {
        if let [command] = pipeline.commands.as_slice() {
            if let Some(builtin) = builtins::find(command.program()) {
                debug!("running builtin {}", command.program());
                return builtin.run(&command.argv);
            }
        }
        self.run_pipeline(&pipeline.commands)
    }

    fn run_pipeline(&self, commands: &[Command]) -> Result<i32, ShellError> {
        debug!("running pipeline of {} command(s)", commands.len());

        // Every pipe exists before the first fork, so each child inherits
        // the full set and closes what it does not use.
        let mut pipes: Vec<(OwnedFd, OwnedFd)> = Vec::new();
        pipes.try_reserve(commands.len().saturating_sub(1))?;
        for _ in 1..commands.len() {
            pipes.push(unistd::pipe()?);
        }

        let mut children: Vec<Pid> = Vec::new();
        children.try_reserve(commands.len())?;

        for (i, command) in commands.iter().enumerate() {
            match unsafe { fork() } {
                Ok(ForkResult::Child) => run_stage(command, i, &pipes),
                Ok(ForkResult::Parent { child }) => children.push(child),
                Err(errno) => {
                    // Close our pipe ends first so the children already
                    // forked see end-of-file and can finish.
                    drop(pipes);
                    reap(&children);
                    return Err(ShellError::Fork(io::Error::from(errno)));
                }
            }
        }

        // The parent never reads or writes the pipes; dropping the fds
        // closes them all.
        drop(pipes);
        Ok(reap(&children))
    }
}

/// Child side of stage `i`: wire the pipe ends, apply redirections,
/// close every pipe descriptor, then run the program. Never returns.
fn run_stage(command: &Command, i: usize, pipes: &[(OwnedFd, OwnedFd)]) -> ! {
    let status = match wire_stage(command, i, pipes) {
        Ok(()) => match builtins::find(command.program()) {
            // A builtin mid-pipeline runs here in the child, where it
            // cannot touch the shell's own state.
            Some(builtin) => run_child_builtin(builtin, &command.argv),
            None => exec_external(command),
        },
        Err(err) => {
            eprintln!("pipesh: {}: {}", command.program(), err);
            1
        }
    };
    // _exit, not exit: this side of the fork must not unwind or flush
    // the parent's buffers.
    unsafe { libc::_exit(status) }
}

fn wire_stage(command: &Command, i: usize, pipes: &[(OwnedFd, OwnedFd)]) -> io::Result<()> {
    // Pipe bindings first; redirections afterwards override them.
    if i > 0 {
        unistd::dup2(pipes[i - 1].0.as_raw_fd(), STDIN)?;
    }
    if i < pipes.len() {
        unistd::dup2(pipes[i].1.as_raw_fd(), STDOUT)?;
    }

    for redirection in &command.redirections {
        apply_redirection(redirection)?;
    }

    // Close both ends of every pipe. A stray open write end anywhere
    // keeps downstream readers from ever seeing end-of-file.
    for (read_end, write_end) in pipes {
        let _ = unistd::close(read_end.as_raw_fd());
        let _ = unistd::close(write_end.as_raw_fd());
    }
    Ok(())
}

fn apply_redirection(redirection: &Redirection) -> io::Result<()> {
    let (file, stream) = match redirection.op {
        RedirectOp::Input => {
            let file = OpenOptions::new().read(true).open(&redirection.filename);
            (file, STDIN)
        }
        RedirectOp::Output => {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o644)
                .open(&redirection.filename);
            (file, STDOUT)
        }
        RedirectOp::Append => {
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .mode(0o644)
                .open(&redirection.filename);
            (file, STDOUT)
        }
    };
    let file = file.map_err(|err| {
        io::Error::new(err.kind(), format!("{}: {}", redirection.filename, err))
    })?;

    let fd = file.into_raw_fd();
    unistd::dup2(fd, stream)?;
    unistd::close(fd)?;
    Ok(())
}

fn run_child_builtin(builtin: &builtins::Builtin, argv: &[String]) -> i32 {
    match builtin.run(argv) {
        Ok(status) => status,
        // exit inside a pipeline ends its own stage only.
        Err(ShellError::Exit) => 0,
        Err(err) => {
            eprintln!("pipesh: {}: {}", builtin.name, err);
            1
        }
    }
}

/// Replaces the child image. Returns only if exec failed, with the
/// status the child should exit with.
fn exec_external(command: &Command) -> i32 {
    let argv: Result<Vec<CString>, _> = command
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect();
    let argv = match argv {
        Ok(argv) => argv,
        Err(_) => {
            eprintln!(
                "pipesh: {}: argument contains an interior NUL byte",
                command.program()
            );
            return STATUS_EXEC_FAILED;
        }
    };
    let program = match argv.first() {
        Some(program) => program,
        None => return STATUS_EXEC_FAILED,
    };

    let errno = match unistd::execvp(program, &argv) {
        Ok(never) => match never {},
        Err(errno) => errno,
    };
    eprintln!(
        "pipesh: {}: {}",
        command.program(),
        io::Error::from(errno)
    );
    if errno == nix::Error::ENOENT {
        STATUS_NOT_FOUND
    } else {
        STATUS_EXEC_FAILED
    }
}

/// Waits for every child, in order, and returns the last stage's status.
/// A signal death maps to 128 plus the signal number.
fn reap(children: &[Pid]) -> i32 {
    let mut status = 0;
    for &child in children {
        status = wait_for(child);
    }
    status
}

fn wait_for(child: Pid) -> i32 {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(WaitStatus::Signaled(_, signal, _)) => return 128 + signal as i32,
            Ok(other) => {
                debug!("child {} reported {:?}, waiting again", child, other);
            }
            Err(nix::Error::EINTR) => {}
            Err(err) => {
                warn!("waitpid({}) failed: {}", child, err);
                return 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::lexer::tokenize;
    use crate::shell::parser::parser::parse;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[allow(clippy::unwrap_used)]
    fn run(line: &str) -> Result<i32, ShellError> {
        let tokens = tokenize(line).unwrap();
        let pipeline = parse(&tokens).unwrap();
        Executor::new().execute(&pipeline)
    }

    #[allow(clippy::unwrap_used)]
    fn temp_path(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("pipesh_{}_{}_{}", tag, std::process::id(), nanos))
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn external_command_status_is_propagated() {
        assert_eq!(run("true").unwrap(), 0);
        assert_eq!(run("false").unwrap(), 1);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn pipeline_status_is_the_last_stage() {
        assert_eq!(run("false | true").unwrap(), 0);
        assert_eq!(run("true | false").unwrap(), 1);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn three_stage_pipeline_moves_data_through_both_pipes() {
        let out = temp_path("three_stage");
        assert_eq!(
            run(&format!("echo hello | cat | cat > {}", out.display())).unwrap(),
            0
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
        fs::remove_file(&out).unwrap();
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn output_redirection_truncates() {
        let out = temp_path("truncate");
        fs::write(&out, "old contents that should vanish").unwrap();
        assert_eq!(run(&format!("echo new > {}", out.display())).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "new\n");
        fs::remove_file(&out).unwrap();
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn append_redirection_keeps_contents() {
        let out = temp_path("append");
        assert_eq!(run(&format!("echo one > {}", out.display())).unwrap(), 0);
        assert_eq!(run(&format!("echo two >> {}", out.display())).unwrap(), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "one\ntwo\n");
        fs::remove_file(&out).unwrap();
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn last_output_redirection_wins() {
        let first = temp_path("redir_first");
        let second = temp_path("redir_second");
        assert_eq!(
            run(&format!(
                "echo x > {} >> {}",
                first.display(),
                second.display()
            ))
            .unwrap(),
            0
        );
        // Both files are opened in order; only the later binding
        // receives the output.
        assert_eq!(fs::read_to_string(&first).unwrap(), "");
        assert_eq!(fs::read_to_string(&second).unwrap(), "x\n");
        fs::remove_file(&first).unwrap();
        fs::remove_file(&second).unwrap();
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn input_redirection_reads_the_file() {
        let input = temp_path("input");
        let out = temp_path("input_out");
        fs::write(&input, "from a file\n").unwrap();
        assert_eq!(
            run(&format!("cat < {} > {}", input.display(), out.display())).unwrap(),
            0
        );
        assert_eq!(fs::read_to_string(&out).unwrap(), "from a file\n");
        fs::remove_file(&input).unwrap();
        fs::remove_file(&out).unwrap();
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn missing_input_file_fails_the_stage() {
        assert_eq!(run("cat < /definitely/not/here/pipesh").unwrap(), 1);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn unknown_program_exits_not_found() {
        assert_eq!(run("definitely-not-a-program-pipesh").unwrap(), 127);
        assert_eq!(run("true | definitely-not-a-program-pipesh").unwrap(), 127);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn builtin_fast_path_runs_in_process() {
        // A forked cd would report failure through an exit status; only
        // the in-process path can surface the error itself.
        let result = run("cd /definitely/not/a/directory/pipesh");
        assert!(matches!(result, Err(ShellError::Syscall(_))));
    }

    #[test]
    fn exit_on_the_fast_path_requests_termination() {
        assert!(matches!(run("exit"), Err(ShellError::Exit)));
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn exit_inside_a_pipeline_does_not_end_the_shell() {
        assert_eq!(run("exit | cat").unwrap(), 0);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn help_runs_on_the_fast_path() {
        assert_eq!(run("help").unwrap(), 0);
    }
}
