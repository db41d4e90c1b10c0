//! Chord grammar.
//!
//! A chord is a whitespace-separated sequence of steps. Each step is a key
//! with optional modifier prefixes: `C-` control, `A-` alt, `S-` shift,
//! `M-` meta. Keys are lowercased key names, or one of the symbolic tokens
//! `<0>`..`<9>` (mouse buttons), `<MWU>`/`<MWD>` (wheel) and `<space>`.
//!
//! ```text
//! C-z          control + z
//! C-S-<MWU>    control + shift + wheel up
//! i n t j      four plain key presses in a row
//! ```

use crate::error::{StageError, StageResult};
use crate::input::{InputEvent, Modifiers, WheelDirection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Full-width punctuation produced by some input methods, mapped to the
/// ASCII key it sits on.
const FULL_WIDTH_KEYS: &[(&str, &str)] = &[
    ("【", "["),
    ("】", "]"),
    ("；", ";"),
    ("‘", "'"),
    ("’", "'"),
    ("“", "\""),
    ("”", "\""),
    ("，", ","),
    ("。", "."),
    ("、", "\\"),
    ("《", "<"),
    ("》", ">"),
    ("？", "?"),
    ("！", "!"),
    ("：", ":"),
    ("·", "`"),
    ("¥", "$"),
    ("～", "~"),
    ("……", "^"),
    ("｜", "|"),
];

const MODIFIER_KEYS: &[&str] = &["control", "alt", "shift", "meta"];

/// Lowercase a key name and fold full-width punctuation.
pub fn normalize_key(key: &str) -> String {
    let lower = key.to_lowercase();
    FULL_WIDTH_KEYS
        .iter()
        .find(|(wide, _)| *wide == lower)
        .map(|(_, ascii)| ascii.to_string())
        .unwrap_or(lower)
}

/// True for keys that only change modifier state.
pub fn is_modifier_key(key: &str) -> bool {
    MODIFIER_KEYS.iter().any(|m| key.eq_ignore_ascii_case(m))
}

/// What a single chord step presses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyToken {
    Key(String),
    Mouse(u8),
    Wheel(WheelDirection),
}

impl KeyToken {
    /// Token released by a key-up or mouse-up event.
    pub fn released_by(event: &InputEvent) -> Option<Self> {
        match event {
            InputEvent::KeyUp { key, .. } => Some(KeyToken::Key(normalize_key(key))),
            InputEvent::MouseUp { button, .. } => Some(KeyToken::Mouse(button.index())),
            _ => None,
        }
    }

    fn parse(s: &str, token: &str) -> StageResult<Self> {
        let invalid = || StageError::InvalidChord(format!("bad key `{}` in `{}`", s, token));
        if s.len() > 2 && s.starts_with('<') && s.ends_with('>') {
            let inner = &s[1..s.len() - 1];
            if inner.chars().all(|c| c.is_ascii_digit()) {
                return inner.parse().map(KeyToken::Mouse).map_err(|_| invalid());
            }
            return match inner {
                "MWU" => Ok(KeyToken::Wheel(WheelDirection::Up)),
                "MWD" => Ok(KeyToken::Wheel(WheelDirection::Down)),
                _ if inner.eq_ignore_ascii_case("space") => Ok(KeyToken::Key(" ".to_string())),
                _ => Err(invalid()),
            };
        }
        if s.is_empty() {
            return Err(invalid());
        }
        Ok(KeyToken::Key(normalize_key(s)))
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Key(key) if key == " " => write!(f, "<space>"),
            KeyToken::Key(key) => write!(f, "{}", key),
            KeyToken::Mouse(n) => write!(f, "<{}>", n),
            KeyToken::Wheel(WheelDirection::Up) => write!(f, "<MWU>"),
            KeyToken::Wheel(WheelDirection::Down) => write!(f, "<MWD>"),
        }
    }
}

/// One step of a chord: modifiers plus a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordStep {
    pub modifiers: Modifiers,
    pub key: KeyToken,
}

impl ChordStep {
    /// Step produced by a press event. Key-ups, moves and bare modifier
    /// presses produce nothing.
    pub fn from_event(event: &InputEvent) -> Option<Self> {
        let key = match event {
            InputEvent::KeyDown { key, .. } if is_modifier_key(key) => return None,
            InputEvent::KeyDown { key, .. } => KeyToken::Key(normalize_key(key)),
            InputEvent::MouseDown { button, .. } => KeyToken::Mouse(button.index()),
            InputEvent::Wheel { direction, .. } => KeyToken::Wheel(*direction),
            _ => return None,
        };
        Some(Self {
            modifiers: event.modifiers(),
            key,
        })
    }

    fn parse(token: &str) -> StageResult<Self> {
        let mut modifiers = Modifiers::NONE;
        let mut rest = token;
        while rest.len() > 2 && rest.as_bytes()[1] == b'-' && rest.as_bytes()[0].is_ascii() {
            match rest.as_bytes()[0].to_ascii_uppercase() {
                b'C' => modifiers.ctrl = true,
                b'A' => modifiers.alt = true,
                b'S' => modifiers.shift = true,
                b'M' => modifiers.meta = true,
                _ => {
                    return Err(StageError::InvalidChord(format!(
                        "unknown modifier in `{}`",
                        token
                    )));
                }
            }
            rest = &rest[2..];
        }
        Ok(Self {
            modifiers,
            key: KeyToken::parse(rest, token)?,
        })
    }
}

impl fmt::Display for ChordStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.ctrl {
            write!(f, "C-")?;
        }
        if self.modifiers.alt {
            write!(f, "A-")?;
        }
        if self.modifiers.shift {
            write!(f, "S-")?;
        }
        if self.modifiers.meta {
            write!(f, "M-")?;
        }
        write!(f, "{}", self.key)
    }
}

/// A parsed chord.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chord {
    steps: Vec<ChordStep>,
}

impl Chord {
    pub fn parse(s: &str) -> StageResult<Self> {
        let steps = s
            .split_whitespace()
            .map(ChordStep::parse)
            .collect::<StageResult<Vec<_>>>()?;
        if steps.is_empty() {
            return Err(StageError::InvalidChord("empty chord".to_string()));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[ChordStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step whose key is held for up and drag handlers.
    pub fn last(&self) -> Option<&ChordStep> {
        self.steps.last()
    }

    /// Does the recent event history end with this chord?
    pub fn matches_tail<'a, I>(&self, recent: I) -> bool
    where
        I: DoubleEndedIterator<Item = &'a ChordStep> + ExactSizeIterator,
    {
        if recent.len() < self.steps.len() {
            return false;
        }
        recent
            .rev()
            .zip(self.steps.iter().rev())
            .all(|(seen, wanted)| seen == wanted)
    }
}

impl FromStr for Chord {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chord::parse(s)
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
