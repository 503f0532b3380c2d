//! Editor configuration
//!
//! A programmatic configuration value: typed settings, the color
//! matrices handed to frames, and the ordered load-rule table.
//! `finish()` validates the table (a rule action not starting with `X`
//! or `L` is fatal) and derives the pixel sizes that scale with the font.

use std::collections::HashMap;

use thiserror::Error;

use crate::core::color::{Color, ColorMatrix};

/// One load rule as configured: a buffer-path regex (`"/"` means
/// directories only), a content regex, and an `X`/`L` action template
#[derive(Debug, Clone)]
pub struct LoadRuleDef {
    pub buf_re: String,
    pub re: String,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    String(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("load rule actions must start with X or L: {0}")]
    BadRuleAction(String),
    #[error("bad load rule regex {0}: {1}")]
    BadRuleRegex(String, String),
    #[error("bad font size {0}")]
    BadFontSize(i32),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub main_font_size: i32,
    pub tab_width: usize,
    /// Attach a backtrace to warnings produced by contained panics
    pub edit_error_trace: bool,
    pub load_rules: Vec<LoadRuleDef>,
    pub body_colors: ColorMatrix,
    pub tag_colors: ColorMatrix,
    /// Free-form settings
    pub settings: HashMap<String, ConfigValue>,

    // derived by finish()
    pub startup_width: i32,
    pub startup_height: i32,
    pub scroll_width: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_font_size: 16,
            tab_width: 8,
            edit_error_trace: false,
            load_rules: default_load_rules(),
            body_colors: default_body_colors(),
            tag_colors: default_tag_colors(),
            settings: HashMap::new(),
            startup_width: 0,
            startup_height: 0,
            scroll_width: 0,
        }
    }
}

impl Config {
    /// Set a free-form setting
    pub fn set<V: Into<ConfigValue>>(&mut self, key: &str, value: V) {
        self.settings.insert(key.to_string(), value.into());
    }

    /// Validate the configuration and derive the font-scaled sizes.
    /// Called once at startup; errors here are fatal.
    pub fn finish(&mut self) -> Result<(), ConfigError> {
        if self.main_font_size <= 0 {
            return Err(ConfigError::BadFontSize(self.main_font_size));
        }
        for rule in &self.load_rules {
            if !rule.action.starts_with('X') && !rule.action.starts_with('L') {
                return Err(ConfigError::BadRuleAction(rule.action.clone()));
            }
        }
        self.startup_width = self.main_font_size * 40;
        self.startup_height = self.main_font_size * 30;
        self.scroll_width = (self.main_font_size as f64 * 0.625) as i32;
        Ok(())
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::String(v.to_string())
    }
}

/// The standard rule table: `file:line`, `file:/regex/`, URLs,
/// directory entries, plain filenames. Order matters; the first rule
/// whose action succeeds wins.
pub fn default_load_rules() -> Vec<LoadRuleDef> {
    vec![
        LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "([a-zA-Z_0-9~./\\-]+):([0-9]+)".to_string(),
            action: "L$1:$2".to_string(),
        },
        LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "([a-zA-Z_0-9~./\\-]+):/([^/]+)/".to_string(),
            action: "L$1:/$2/".to_string(),
        },
        LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "https?://[^\\s]+".to_string(),
            action: "X xdg-open $0".to_string(),
        },
        LoadRuleDef {
            buf_re: "/".to_string(),
            re: "([^\\s]+)".to_string(),
            action: "L$1:".to_string(),
        },
        LoadRuleDef {
            buf_re: ".*".to_string(),
            re: "([a-zA-Z_0-9~./\\-]+)".to_string(),
            action: "L$1:".to_string(),
        },
    ]
}

/// Body color matrix: base row, three selection rows (point, exec,
/// load), and the parenthesis-match row. Columns: background, default
/// foreground, accent, comment.
pub fn default_body_colors() -> ColorMatrix {
    let bg = Color::rgb(0xff, 0xff, 0xea);
    let fg = Color::rgb(0x10, 0x10, 0x10);
    let comment = Color::rgb(0x70, 0x70, 0x70);
    vec![
        vec![bg, fg, Color::rgb(0x00, 0x50, 0x90), comment],
        vec![Color::rgb(0xee, 0xee, 0x9e), fg, fg, comment],
        vec![Color::rgb(0xaa, 0x00, 0x00), Color::WHITE, Color::WHITE, Color::WHITE],
        vec![Color::rgb(0x00, 0x66, 0x00), Color::WHITE, Color::WHITE, Color::WHITE],
        vec![Color::rgb(0xc0, 0xc0, 0xc0), fg, fg, comment],
    ]
}

/// Tag color matrix: base row plus one selection row
pub fn default_tag_colors() -> ColorMatrix {
    let bg = Color::rgb(0xea, 0xff, 0xff);
    let fg = Color::rgb(0x10, 0x10, 0x10);
    vec![
        vec![bg, fg],
        vec![Color::rgb(0x9e, 0xee, 0xee), fg],
    ]
}
