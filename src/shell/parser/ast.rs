use super::lexer::RedirectOp;

/// The parsed line: one or more commands connected by pipes. A lone
/// command is a pipeline of length one. Owns every command in it.
#[derive(Debug)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

/// One command: its argument vector (argv[0] is the program name, never
/// empty after parsing) and its redirections in source order.
#[derive(Debug, Clone)]
pub struct Command {
    pub argv: Vec<String>,
    pub redirections: Vec<Redirection>,
}

impl Command {
    pub fn program(&self) -> &str {
        self.argv.first().map(String::as_str).unwrap_or_default()
    }
}

/// One rebinding of a standard stream to a named file. The filename is
/// an owned copy so the AST can outlive the input line.
#[derive(Debug, Clone)]
pub struct Redirection {
    pub op: RedirectOp,
    pub filename: String,
}
