use std::collections::TryReserveError;
use std::fmt;
use std::io;

/// What the read loop should do after an error has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Exit,
}

/// Everything that can go wrong between reading a line and reaping the
/// last child of its pipeline. Presentation is the loop's job; this type
/// only carries the kind and detail.
#[derive(Debug)]
pub enum ShellError {
    /// Malformed pipeline: empty command, dangling redirection.
    Syntax(String),
    /// Growing a token or AST buffer failed.
    Alloc,
    /// pipe/dup2/open/wait failed.
    Syscall(io::Error),
    /// Process creation failed.
    Fork(io::Error),
    /// Upstream signaled no more input.
    Eof,
    /// A builtin requested termination.
    Exit,
}

impl ShellError {
    /// Syntax, allocation and syscall failures are recoverable; fork
    /// failure, end of input and an explicit exit end the session.
    pub fn loop_action(&self) -> LoopAction {
        match self {
            ShellError::Syntax(_) | ShellError::Alloc | ShellError::Syscall(_) => {
                LoopAction::Continue
            }
            ShellError::Fork(_) | ShellError::Eof | ShellError::Exit => LoopAction::Exit,
        }
    }
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShellError::Syntax(msg) => write!(f, "syntax error: {}", msg),
            ShellError::Alloc => write!(f, "out of memory"),
            ShellError::Syscall(err) => write!(f, "system call failed: {}", err),
            ShellError::Fork(err) => write!(f, "cannot create process: {}", err),
            ShellError::Eof => write!(f, "end of input"),
            ShellError::Exit => write!(f, "exit requested"),
        }
    }
}

impl std::error::Error for ShellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShellError::Syscall(err) | ShellError::Fork(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for ShellError {
    fn from(err: io::Error) -> Self {
        ShellError::Syscall(err)
    }
}

impl From<nix::Error> for ShellError {
    fn from(err: nix::Error) -> Self {
        ShellError::Syscall(io::Error::from(err))
    }
}

impl From<TryReserveError> for ShellError {
    fn from(_: TryReserveError) -> Self {
        ShellError::Alloc
    }
}
