//! Keystroke replay scripts: line-oriented files driving the engine
//! without a terminal.
//!
//! # Format
//! - A plain line is a literal key (`x`, `+`, one character), or a
//!   backslash escape (`\n`, `\t`, `\r`, `\\`).
//! - A bracketed token names a control key: `<up>`, `<down>`, `<left>`,
//!   `<right>`, `<space>`, `<tab>`, `<enter>`, `<esc>`, `<backspace>`
//!   (case-insensitive).
//! - Blank lines and lines starting with `#` are skipped.
//! - An unreadable file, or one containing no keys, is a hard startup
//!   error, not a silent no-op.

use crate::engine::Command;
use crate::engine::viewport::Direction;
use crate::model::PointKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// One decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Backspace,
    Escape,
}

/// What a keystroke means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    /// End of the session; stops script replay.
    Quit,
    /// A key with no engine meaning; skipped.
    Ignore,
}

#[derive(Debug)]
pub enum ScriptError {
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The file exists but contains no keystrokes.
    Empty(PathBuf),
    InvalidKey {
        line: usize,
        text: String,
    },
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { path, source } => {
                write!(f, "could not read keystroke file `{}`: {source}", path.display())
            }
            Self::Empty(path) => {
                write!(f, "keystroke file `{}` contains no keystrokes", path.display())
            }
            Self::InvalidKey { line, text } => {
                write!(f, "invalid keystroke on line {line}: {text}")
            }
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Parses a keystroke file into keys, in order.
pub fn parse_script(path: impl AsRef<Path>) -> Result<Vec<Key>, ScriptError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;

    let mut keys = Vec::new();
    for (index, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_key(line) {
            Some(key) => keys.push(key),
            None => {
                return Err(ScriptError::InvalidKey {
                    line: index + 1,
                    text: line.to_string(),
                });
            }
        }
    }

    if keys.is_empty() {
        return Err(ScriptError::Empty(path.to_path_buf()));
    }

    Ok(keys)
}

/// Decodes one non-empty script line.
pub fn parse_key(line: &str) -> Option<Key> {
    if line.len() >= 2 && line.starts_with('<') && line.ends_with('>') {
        return match line[1..line.len() - 1].to_ascii_lowercase().as_str() {
            "up" => Some(Key::Up),
            "down" => Some(Key::Down),
            "left" => Some(Key::Left),
            "right" => Some(Key::Right),
            "space" => Some(Key::Char(' ')),
            "tab" => Some(Key::Char('\t')),
            "enter" => Some(Key::Char('\n')),
            "esc" => Some(Key::Escape),
            "backspace" => Some(Key::Backspace),
            _ => None,
        };
    }

    let mut chars = line.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(only), None, _) => Some(Key::Char(only)),
        (Some('\\'), Some(escape), None) => match escape {
            'n' => Some(Key::Char('\n')),
            't' => Some(Key::Char('\t')),
            'r' => Some(Key::Char('\r')),
            '\\' => Some(Key::Char('\\')),
            _ => None,
        },
        _ => None,
    }
}

/// Maps a keystroke to its engine meaning.
pub fn action_for_key(key: Key) -> KeyAction {
    match key {
        Key::Up => KeyAction::Command(Command::Move(Direction::Up)),
        Key::Down => KeyAction::Command(Command::Move(Direction::Down)),
        Key::Left => KeyAction::Command(Command::Move(Direction::Left)),
        Key::Right => KeyAction::Command(Command::Move(Direction::Right)),
        Key::Backspace => KeyAction::Command(Command::Delete),
        Key::Escape => KeyAction::Quit,
        Key::Char(c) => match c {
            'x' => KeyAction::Command(Command::Create(PointKind::X)),
            'o' => KeyAction::Command(Command::Create(PointKind::O)),
            'X' => KeyAction::Command(Command::Retype(PointKind::X)),
            'O' => KeyAction::Command(Command::Retype(PointKind::O)),
            'g' => KeyAction::Command(Command::Flip),
            ' ' => KeyAction::Command(Command::Delete),
            'u' => KeyAction::Command(Command::Undo),
            'r' => KeyAction::Command(Command::Redo),
            '+' | '=' => KeyAction::Command(Command::ZoomIn),
            '-' | '_' => KeyAction::Command(Command::ZoomOut),
            'f' => KeyAction::Command(Command::ResetView),
            's' | 'S' => KeyAction::Command(Command::Save),
            'q' | 'Q' => KeyAction::Quit,
            _ => KeyAction::Ignore,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{action_for_key, parse_key, Key, KeyAction};
    use crate::engine::viewport::Direction;
    use crate::engine::Command;

    #[test]
    fn bracketed_tokens_decode_case_insensitively() {
        assert_eq!(parse_key("<up>"), Some(Key::Up));
        assert_eq!(parse_key("<RIGHT>"), Some(Key::Right));
        assert_eq!(parse_key("<Space>"), Some(Key::Char(' ')));
        assert_eq!(parse_key("<backspace>"), Some(Key::Backspace));
        assert_eq!(parse_key("<pageup>"), None);
    }

    #[test]
    fn literal_and_escaped_characters_decode() {
        assert_eq!(parse_key("x"), Some(Key::Char('x')));
        assert_eq!(parse_key("\\n"), Some(Key::Char('\n')));
        assert_eq!(parse_key("\\\\"), Some(Key::Char('\\')));
        assert_eq!(parse_key("\\z"), None);
        assert_eq!(parse_key("ab"), None);
    }

    #[test]
    fn keys_map_to_engine_commands() {
        assert_eq!(
            action_for_key(Key::Up),
            KeyAction::Command(Command::Move(Direction::Up))
        );
        assert_eq!(
            action_for_key(Key::Char('x')),
            KeyAction::Command(Command::Create(crate::model::PointKind::X))
        );
        assert_eq!(
            action_for_key(Key::Backspace),
            KeyAction::Command(Command::Delete)
        );
        assert_eq!(action_for_key(Key::Char('q')), KeyAction::Quit);
        assert_eq!(action_for_key(Key::Escape), KeyAction::Quit);
        assert_eq!(action_for_key(Key::Char('?')), KeyAction::Ignore);
    }
}
