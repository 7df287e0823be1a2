use colored::Colorize;
use once_cell::sync::Lazy;
use std::collections::HashMap;

type Messages = HashMap<&'static str, &'static str>;

static DEFAULT_MESSAGES: Lazy<Messages> = Lazy::new(|| {
    HashMap::from([
        ("welcome", "welcome to pipesh"),
        ("help", "pipelines, < > >> redirections; builtins: cd, help, exit"),
        ("prompt", "pipesh> "),
        ("exit", "bye"),
        ("eof_signal", "end of input, leaving"),
        ("interrupt_signal", "interrupted, line dropped"),
        ("error", "input error"),
        ("success_symbol", "✓"),
        ("command_success", "done"),
        ("error_symbol", "✗"),
        ("command_error", "command failed"),
        ("execution_error", "cannot run"),
    ])
});

static DARK_MESSAGES: Lazy<Messages> = Lazy::new(|| {
    HashMap::from([
        ("welcome", "pipesh, lights out"),
        ("help", "pipelines, < > >> redirections; builtins: cd, help, exit"),
        ("prompt", "pipesh ➤ "),
        ("exit", "gone"),
        ("eof_signal", "eof, closing up"),
        ("interrupt_signal", "dropped that line"),
        ("error", "input error"),
        ("success_symbol", "•"),
        ("command_success", "ok"),
        ("error_symbol", "✗"),
        ("command_error", "command failed"),
        ("execution_error", "cannot run"),
    ])
});

/// Every user-facing string the loop prints, keyed by message name,
/// plus the styles to render them with. Presentation only; no message
/// here carries control-flow meaning.
pub struct Theme {
    messages: &'static Messages,
    pub prompt_style: Box<dyn Fn(String) -> String>,
    pub success_style: Box<dyn Fn(String) -> String>,
    pub warning_style: Box<dyn Fn(String) -> String>,
    pub error_style: Box<dyn Fn(String) -> String>,
}

impl Theme {
    pub fn get_message(&self, key: &str) -> String {
        self.messages.get(key).copied().unwrap_or(key).to_string()
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            messages: &DEFAULT_MESSAGES,
            prompt_style: Box::new(|s| s.bright_cyan().to_string()),
            success_style: Box::new(|s| s.bright_green().to_string()),
            warning_style: Box::new(|s| s.bright_yellow().to_string()),
            error_style: Box::new(|s| s.bright_red().to_string()),
        }
    }
}

pub fn load_theme(theme_name: &str) -> Theme {
    match theme_name {
        "default" => Theme::default(),
        "dark" => Theme {
            messages: &DARK_MESSAGES,
            prompt_style: Box::new(|s| s.bright_purple().to_string()),
            success_style: Box::new(|s| s.green().to_string()),
            warning_style: Box::new(|s| s.yellow().to_string()),
            error_style: Box::new(|s| s.red().to_string()),
        },
        _ => Theme::default(),
    }
}
