use dotenv::dotenv;
use rustyline::EditMode;
use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub theme: String,
    pub history_file: PathBuf,
    pub editor_mode: String,
}

impl Config {
    fn get_config_dir() -> PathBuf {
        if let Ok(home) = env::var("HOME") {
            PathBuf::from(home).join(".config/pipesh")
        } else {
            PathBuf::from("tmp")
        }
    }

    fn default() -> Self {
        let config_dir = Self::get_config_dir();
        Config {
            name: String::from("pipesh"),
            theme: String::from("default"),
            history_file: config_dir.join(".pipesh_history"),
            editor_mode: String::from("emacs"),
        }
    }

    pub fn new() -> io::Result<Self> {
        // Environment first; a .env.development file wins in debug builds.
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::default();

        if let Ok(theme) = env::var("PIPESH_THEME") {
            config.theme = theme;
        }

        if let Ok(editor) = env::var("PIPESH_EDITOR") {
            config.editor_mode = editor;
        }

        if let Ok(history) = env::var("PIPESH_HISTORY") {
            config.history_file = PathBuf::from(history);
        }

        // The history file and the log file share this directory.
        if let Some(parent) = config.history_file.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(config)
    }

    pub fn get_edit_mode(&self) -> EditMode {
        match self.editor_mode.to_lowercase().as_str() {
            "vi" | "vim" => EditMode::Vi,
            _ => EditMode::Emacs,
        }
    }
}
