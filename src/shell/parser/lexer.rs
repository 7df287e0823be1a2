use std::iter::Peekable;
use std::str::CharIndices;

use crate::shell::error::ShellError;

/// One lexed token. Words borrow their text from the input line, so a
/// token sequence never outlives the line it was produced from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Token<'a> {
    Word(&'a str),
    Pipe,
    Redirect(RedirectOp),
    Eof,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RedirectOp {
    Input,  // <
    Output, // >
    Append, // >>
}

/// Scans a whole line into tokens. The sequence always ends with exactly
/// one `Eof`; an empty or all-whitespace line yields `[Eof]` alone.
pub fn tokenize(input: &str) -> Result<Vec<Token<'_>>, ShellError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token();
        if tokens.len() == tokens.capacity() {
            tokens.try_reserve(1)?;
        }
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    iter: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            iter: input.char_indices().peekable(),
        }
    }

    fn next_token(&mut self) -> Token<'a> {
        self.skip_whitespace();

        match self.peek_char() {
            None => Token::Eof,
            Some(c) => match c {
                '|' => {
                    self.read_char();
                    Token::Pipe
                }
                '<' => {
                    self.read_char();
                    Token::Redirect(RedirectOp::Input)
                }
                '>' => {
                    self.read_char();
                    if self.peek_char() == Some('>') {
                        self.read_char();
                        Token::Redirect(RedirectOp::Append)
                    } else {
                        Token::Redirect(RedirectOp::Output)
                    }
                }
                _ => self.read_word(),
            },
        }
    }

    fn read_char(&mut self) -> Option<(usize, char)> {
        self.iter.next()
    }

    fn peek_char(&mut self) -> Option<char> {
        self.iter.peek().map(|&(_, c)| c)
    }

    fn peek_offset(&mut self) -> usize {
        self.iter.peek().map_or(self.input.len(), |&(offset, _)| offset)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if !c.is_whitespace() {
                break;
            }
            self.read_char();
        }
    }

    // Operators and whitespace end a word even without spaces around
    // them: "ls>out" is three tokens.
    fn read_word(&mut self) -> Token<'a> {
        let start = self.peek_offset();
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() || "|<>".contains(c) {
                break;
            }
            self.read_char();
        }
        Token::Word(&self.input[start..self.peek_offset()])
    }
}
