use log::{debug, error, warn};
use std::error::Error;
use std::io::Write;

use crate::shell::error::{LoopAction, ShellError};
use crate::shell::executor::Executor;
use crate::shell::parser::lexer::tokenize;
use crate::shell::parser::parser::parse;
use crate::shell::readline::{ReadlineError, ReadlineManager};
use crate::utils::config::Config;
use crate::utils::theme::Theme;

pub struct Shell<'a> {
    theme: &'a Theme,
    readline: ReadlineManager<'a>,
    executor: Executor,
}

impl<'a> Shell<'a> {
    pub fn new(config: &'a Config, theme: &'a Theme) -> Result<Self, ReadlineError> {
        Ok(Self {
            theme,
            readline: ReadlineManager::new(config)?,
            executor: Executor::new(),
        })
    }

    pub fn run(&mut self) -> Result<(), Box<dyn Error>> {
        debug!("starting pipesh");
        self.readline.load_history();

        println!(
            "{}",
            (self.theme.success_style)(self.theme.get_message("welcome"))
        );
        println!(
            "{}",
            (self.theme.warning_style)(self.theme.get_message("help"))
        );

        self.run_loop()?;
        self.readline.save_history();

        debug!("leaving pipesh");
        Ok(())
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn Error>> {
        loop {
            std::io::stdout().flush()?;
            let prompt = (self.theme.prompt_style)(self.theme.get_message("prompt"));

            match self.readline.readline(&prompt) {
                Ok(line) => {
                    if self.handle_line(&line) == LoopAction::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    if self.report_error(&ShellError::Eof) == LoopAction::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    warn!("interrupted at prompt");
                    println!(
                        "\n{}",
                        (self.theme.warning_style)(self.theme.get_message("interrupt_signal"))
                    );
                }
                Err(err) => {
                    error!("readline failed: {}", err);
                    eprintln!(
                        "{}: {}",
                        (self.theme.error_style)(self.theme.get_message("error")),
                        err
                    );
                }
            }
        }
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> LoopAction {
        if line.trim().is_empty() {
            return LoopAction::Continue;
        }
        self.readline.add_history(line.to_string());

        match self.run_line(line) {
            Ok(status) => {
                self.report_status(status);
                LoopAction::Continue
            }
            Err(err) => self.report_error(&err),
        }
    }

    /// Text to tokens to AST to exit status; each stage consumes the
    /// previous one's output and nothing flows backwards.
    fn run_line(&self, line: &str) -> Result<i32, ShellError> {
        let tokens = tokenize(line)?;
        debug!("lexed {} token(s)", tokens.len());
        let pipeline = parse(&tokens)?;
        debug!("parsed {} command(s)", pipeline.commands.len());
        self.executor.execute(&pipeline)
    }

    fn report_status(&self, status: i32) {
        if status == 0 {
            println!(
                "{} {}",
                (self.theme.success_style)(self.theme.get_message("success_symbol")),
                (self.theme.success_style)(self.theme.get_message("command_success"))
            );
        } else {
            eprintln!(
                "{} {} ({})",
                (self.theme.error_style)(self.theme.get_message("error_symbol")),
                (self.theme.error_style)(self.theme.get_message("command_error")),
                status
            );
        }
    }

    fn report_error(&self, err: &ShellError) -> LoopAction {
        match err {
            ShellError::Eof => {
                warn!("end of input");
                println!(
                    "{}",
                    (self.theme.warning_style)(self.theme.get_message("eof_signal"))
                );
            }
            ShellError::Exit => {
                debug!("exit requested");
                println!(
                    "{}",
                    (self.theme.success_style)(self.theme.get_message("exit"))
                );
            }
            err => {
                error!("{}", err);
                eprintln!(
                    "{} {}",
                    (self.theme.error_style)(self.theme.get_message("error_symbol")),
                    (self.theme.error_style)(format!(
                        "{}: {}",
                        self.theme.get_message("execution_error"),
                        err
                    ))
                );
            }
        }
        err.loop_action()
    }
}
