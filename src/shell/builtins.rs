use log::debug;
use std::env;

use crate::shell::error::ShellError;

/// Builtins return the same shape as external execution so the executor
/// can treat both uniformly.
pub type BuiltinResult = Result<i32, ShellError>;

type BuiltinFn = fn(&[String]) -> BuiltinResult;

pub struct Builtin {
    pub name: &'static str,
    pub usage: &'static str,
    handler: BuiltinFn,
}

impl Builtin {
    /// Runs the builtin with the full argument vector, argv[0] included.
    pub fn run(&self, argv: &[String]) -> BuiltinResult {
        (self.handler)(argv)
    }
}

static BUILTINS: &[Builtin] = &[
    Builtin {
        name: "cd",
        usage: "cd [dir]   change working directory (default ~)",
        handler: builtin_cd,
    },
    Builtin {
        name: "help",
        usage: "help       list builtin commands",
        handler: builtin_help,
    },
    Builtin {
        name: "exit",
        usage: "exit       leave the shell",
        handler: builtin_exit,
    },
];

pub fn find(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|builtin| builtin.name == name)
}

fn builtin_cd(argv: &[String]) -> BuiltinResult {
    let target = argv.get(1).map(String::as_str).unwrap_or("~");
    let target = shellexpand::tilde(target);
    debug!("cd {}", target);
    env::set_current_dir(target.as_ref())?;
    Ok(0)
}

fn builtin_help(_argv: &[String]) -> BuiltinResult {
    println!("builtin commands:");
    for builtin in BUILTINS {
        println!("  {}", builtin.usage);
    }
    Ok(0)
}

fn builtin_exit(_argv: &[String]) -> BuiltinResult {
    Err(ShellError::Exit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_knows_every_builtin() {
        for name in ["cd", "help", "exit"] {
            assert!(find(name).is_some(), "{} should be a builtin", name);
        }
        assert!(find("ls").is_none());
        assert!(find("").is_none());
    }

    #[test]
    fn exit_requests_termination() {
        let argv = vec!["exit".to_string()];
        assert!(matches!(builtin_exit(&argv), Err(ShellError::Exit)));
    }

    #[test]
    fn cd_to_missing_directory_is_a_syscall_failure() {
        let argv = vec![
            "cd".to_string(),
            "/definitely/not/a/directory/pipesh".to_string(),
        ];
        assert!(matches!(builtin_cd(&argv), Err(ShellError::Syscall(_))));
    }

    #[test]
    fn help_reports_success() {
        let argv = vec!["help".to_string()];
        assert!(matches!(builtin_help(&argv), Ok(0)));
    }
}
