use super::ast::{Command, Pipeline, Redirection};
use super::lexer::{RedirectOp, Token};
use crate::shell::error::ShellError;

/// Builds the AST for one line from its token sequence.
///
/// Grammar, one token of lookahead:
///
/// ```text
/// pipeline  := redirCmd ('|' redirCmd)*
/// redirCmd  := simpleCmd (redirOp Word)*
/// simpleCmd := Word+
/// redirOp   := '<' | '>' | '>>'
/// ```
pub fn parse(tokens: &[Token]) -> Result<Pipeline, ShellError> {
    Parser::new(tokens).parse_pipeline()
}

struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn current(&self) -> Token<'a> {
        self.tokens.get(self.pos).copied().unwrap_or(Token::Eof)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn parse_pipeline(&mut self) -> Result<Pipeline, ShellError> {
        let mut commands = Vec::new();
        push_checked(&mut commands, self.parse_redir_command()?)?;

        while self.current() == Token::Pipe {
            self.advance();
            push_checked(&mut commands, self.parse_redir_command()?)?;
        }

        match self.current() {
            Token::Eof => Ok(Pipeline { commands }),
            token => Err(ShellError::Syntax(format!(
                "unexpected {} after command",
                describe(token)
            ))),
        }
    }

    fn parse_redir_command(&mut self) -> Result<Command, ShellError> {
        let mut command = self.parse_simple_command()?;

        while let Token::Redirect(op) = self.current() {
            self.advance();
            let redirection = self.parse_redirection(op)?;
            push_checked(&mut command.redirections, redirection)?;
        }

        Ok(command)
    }

    fn parse_simple_command(&mut self) -> Result<Command, ShellError> {
        let mut command = Command {
            argv: Vec::new(),
            redirections: Vec::new(),
        };

        while let Token::Word(word) = self.current() {
            push_checked(&mut command.argv, copy_word(word)?)?;
            self.advance();
        }

        if command.argv.is_empty() {
            return Err(ShellError::Syntax(format!(
                "expected command, found {}",
                describe(self.current())
            )));
        }
        Ok(command)
    }

    fn parse_redirection(&mut self, op: RedirectOp) -> Result<Redirection, ShellError> {
        match self.current() {
            Token::Word(filename) => {
                let redirection = Redirection {
                    op,
                    filename: copy_word(filename)?,
                };
                self.advance();
                Ok(redirection)
            }
            token => Err(ShellError::Syntax(format!(
                "expected filename after redirection, found {}",
                describe(token)
            ))),
        }
    }
}

// Growth goes through try_reserve so a failed allocation surfaces as an
// error instead of aborting; the partially built command is dropped on
// the way out.
fn push_checked<T>(vec: &mut Vec<T>, value: T) -> Result<(), ShellError> {
    if vec.len() == vec.capacity() {
        vec.try_reserve(1)?;
    }
    vec.push(value);
    Ok(())
}

fn copy_word(word: &str) -> Result<String, ShellError> {
    let mut owned = String::new();
    owned.try_reserve(word.len())?;
    owned.push_str(word);
    Ok(owned)
}

fn describe(token: Token) -> String {
    match token {
        Token::Word(text) => format!("word {:?}", text),
        Token::Pipe => "'|'".to_string(),
        Token::Redirect(RedirectOp::Input) => "'<'".to_string(),
        Token::Redirect(RedirectOp::Output) => "'>'".to_string(),
        Token::Redirect(RedirectOp::Append) => "'>>'".to_string(),
        Token::Eof => "end of line".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::parser::lexer::tokenize;

    #[allow(clippy::unwrap_used)]
    fn parse_line(line: &str) -> Result<Pipeline, ShellError> {
        let tokens = tokenize(line).unwrap();
        parse(&tokens)
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_simple_command() {
        let pipeline = parse_line("ls -l").unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        assert_eq!(pipeline.commands[0].argv, vec!["ls", "-l"]);
        assert_eq!(pipeline.commands[0].program(), "ls");
        assert!(pipeline.commands[0].redirections.is_empty());
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_pipeline_keeps_source_order() {
        let pipeline = parse_line("a|b|c").unwrap();
        assert_eq!(pipeline.commands.len(), 3);
        assert_eq!(pipeline.commands[0].argv, vec!["a"]);
        assert_eq!(pipeline.commands[1].argv, vec!["b"]);
        assert_eq!(pipeline.commands[2].argv, vec!["c"]);
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_output_redirection() {
        let pipeline = parse_line("echo hi > out.txt").unwrap();
        assert_eq!(pipeline.commands.len(), 1);
        let command = &pipeline.commands[0];
        assert_eq!(command.argv, vec!["echo", "hi"]);
        assert_eq!(command.redirections.len(), 1);
        assert_eq!(command.redirections[0].op, RedirectOp::Output);
        assert_eq!(command.redirections[0].filename, "out.txt");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_redirections_keep_declaration_order() {
        let pipeline = parse_line("cmd > a >> b").unwrap();
        let redirections = &pipeline.commands[0].redirections;
        assert_eq!(redirections.len(), 2);
        assert_eq!(redirections[0].op, RedirectOp::Output);
        assert_eq!(redirections[0].filename, "a");
        assert_eq!(redirections[1].op, RedirectOp::Append);
        assert_eq!(redirections[1].filename, "b");
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_redirections_in_pipeline() {
        let pipeline = parse_line("sort < in | uniq > out").unwrap();
        assert_eq!(pipeline.commands.len(), 2);
        assert_eq!(pipeline.commands[0].redirections[0].op, RedirectOp::Input);
        assert_eq!(pipeline.commands[0].redirections[0].filename, "in");
        assert_eq!(pipeline.commands[1].redirections[0].op, RedirectOp::Output);
        assert_eq!(pipeline.commands[1].redirections[0].filename, "out");
    }

    #[test]
    fn test_empty_line_is_syntax_error() {
        assert!(matches!(parse_line(""), Err(ShellError::Syntax(_))));
        assert!(matches!(parse_line("   \t "), Err(ShellError::Syntax(_))));
    }

    #[test]
    fn test_dangling_redirection_is_syntax_error() {
        assert!(matches!(parse_line("cmd >"), Err(ShellError::Syntax(_))));
        assert!(matches!(parse_line("cmd > |"), Err(ShellError::Syntax(_))));
        assert!(matches!(parse_line("cmd < >> x"), Err(ShellError::Syntax(_))));
    }

    #[test]
    fn test_misplaced_pipe_is_syntax_error() {
        assert!(matches!(parse_line("| cmd"), Err(ShellError::Syntax(_))));
        assert!(matches!(parse_line("cmd |"), Err(ShellError::Syntax(_))));
        assert!(matches!(parse_line("a || b"), Err(ShellError::Syntax(_))));
    }

    #[test]
    fn test_word_after_redirection_list_is_syntax_error() {
        assert!(matches!(
            parse_line("echo > out extra"),
            Err(ShellError::Syntax(_))
        ));
    }

    #[allow(clippy::unwrap_used)]
    #[test]
    fn test_ast_owns_its_strings() {
        let pipeline = {
            let line = String::from("echo hi > out.txt");
            let tokens = tokenize(&line).unwrap();
            parse(&tokens).unwrap()
            // line and tokens drop here
        };
        assert_eq!(pipeline.commands[0].argv, vec!["echo", "hi"]);
        assert_eq!(pipeline.commands[0].redirections[0].filename, "out.txt");
    }
}
