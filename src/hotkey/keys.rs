//! Key and modifier vocabulary
//!
//! Every recognized key has one canonical name and one numeric code (the
//! browser `keyCode` value). Old misspelled names live in a separate alias
//! table and resolve to their canonical key at lookup time.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::InvalidBinding;

macro_rules! key_table {
    ($($variant:ident = $code:literal),+ $(,)?) => {
        /// Canonical key identifier
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        #[repr(u8)]
        pub enum Key {
            $($variant = $code,)+
        }

        impl Key {
            /// Every canonical key, in table order
            pub const ALL: &'static [Key] = &[$(Key::$variant,)+];

            /// Canonical name of the key
            pub fn name(self) -> &'static str {
                match self {
                    $(Key::$variant => stringify!($variant),)+
                }
            }

            /// Resolve a numeric key code to its canonical key
            pub fn from_code(code: u8) -> Result<Self, InvalidBinding> {
                match code {
                    $($code => Ok(Key::$variant),)+
                    other => Err(InvalidBinding::UnknownCode(other)),
                }
            }
        }
    };
}

key_table! {
    Backspace = 0x08,
    Tab = 0x09,
    Enter = 0x0D,
    Shift = 0x10,
    Ctrl = 0x11,
    Alt = 0x12,
    Pause = 0x13,
    CapsLock = 0x14,
    Escape = 0x1B,
    Space = 0x20,
    PageUp = 0x21,
    PageDown = 0x22,
    End = 0x23,
    Home = 0x24,
    Left = 0x25,
    Up = 0x26,
    Right = 0x27,
    Down = 0x28,
    Insert = 0x2D,
    Delete = 0x2E,
    Num0 = 0x30,
    Num1 = 0x31,
    Num2 = 0x32,
    Num3 = 0x33,
    Num4 = 0x34,
    Num5 = 0x35,
    Num6 = 0x36,
    Num7 = 0x37,
    Num8 = 0x38,
    Num9 = 0x39,
    Semicolon = 0x3B,
    Equal = 0x3D,
    A = 0x41,
    B = 0x42,
    C = 0x43,
    D = 0x44,
    E = 0x45,
    F = 0x46,
    G = 0x47,
    H = 0x48,
    I = 0x49,
    J = 0x4A,
    K = 0x4B,
    L = 0x4C,
    M = 0x4D,
    N = 0x4E,
    O = 0x4F,
    P = 0x50,
    Q = 0x51,
    R = 0x52,
    S = 0x53,
    T = 0x54,
    U = 0x55,
    V = 0x56,
    W = 0x57,
    X = 0x58,
    Y = 0x59,
    Z = 0x5A,
    Meta = 0x5B,
    ContextMenu = 0x5D,
    Multiply = 0x6A,
    Add = 0x6B,
    Subtract = 0x6D,
    Divide = 0x6F,
    F1 = 0x70,
    F2 = 0x71,
    F3 = 0x72,
    F4 = 0x73,
    F5 = 0x74,
    F6 = 0x75,
    F7 = 0x76,
    F8 = 0x77,
    F9 = 0x78,
    F10 = 0x79,
    F11 = 0x7A,
    F12 = 0x7B,
    NumLock = 0x90,
    ScrollLock = 0x91,
    AudioVolumeMute = 0xAD,
    AudioVolumeDown = 0xAE,
    AudioVolumeUp = 0xAF,
    MediaTrackNext = 0xB0,
    MediaTrackPrevious = 0xB1,
    MediaPlayPause = 0xB3,
    LaunchMediaPlayer = 0xB5,
    Comma = 0xBC,
    Hyphen = 0xBD,
    Period = 0xBE,
    Slash = 0xBF,
    BackQuote = 0xC0,
    BraceLeft = 0xDB,
    BackSlash = 0xDC,
    BraceRight = 0xDD,
    SingleQuote = 0xDE,
}

/// Alternate spellings accepted silently
const SYNONYMS: &[(&str, Key)] = &[
    ("ESC", Key::Escape),
    ("PgUp", Key::PageUp),
    ("PgDown", Key::PageDown),
    ("BlaceLeft", Key::BraceLeft),
    ("BlaceRight", Key::BraceRight),
];

/// Deprecated key names and the canonical key they resolve to
const DEPRECATED_ALIASES: &[(&str, Key)] = &[
    ("BackQuart", Key::BackQuote),
    ("SingleQuart", Key::SingleQuote),
];

impl Key {
    /// Look up a key by name (ASCII case-insensitive)
    ///
    /// Synonyms and deprecated aliases resolve to their canonical key. A lone digit is
    /// accepted as shorthand for the matching `Num*` key.
    pub fn from_name(name: &str) -> Result<Self, InvalidBinding> {
        let name = name.trim();

        if let Some(key) = Key::ALL
            .iter()
            .copied()
            .find(|key| key.name().eq_ignore_ascii_case(name))
        {
            return Ok(key);
        }

        if let Some((_, key)) = SYNONYMS
            .iter()
            .find(|(synonym, _)| synonym.eq_ignore_ascii_case(name))
        {
            return Ok(*key);
        }

        if let Some((alias, key)) = DEPRECATED_ALIASES
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        {
            warn!(alias, canonical = key.name(), "deprecated key name");
            return Ok(*key);
        }

        match name.as_bytes() {
            [digit @ b'0'..=b'9'] => Key::from_code(*digit),
            _ => Err(InvalidBinding::UnknownKey(name.to_string())),
        }
    }

    /// Numeric key code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// The modifier this key represents, if it is a modifier key
    pub fn as_modifier(self) -> Option<ModifierKey> {
        match self {
            Key::Ctrl => Some(ModifierKey::Ctrl),
            Key::Shift => Some(ModifierKey::Shift),
            Key::Alt => Some(ModifierKey::Alt),
            Key::Meta => Some(ModifierKey::Meta),
            _ => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Key {
    type Err = InvalidBinding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_name(s)
    }
}

impl TryFrom<String> for Key {
    type Error = InvalidBinding;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Key::from_name(&value)
    }
}

impl From<Key> for String {
    fn from(key: Key) -> Self {
        key.name().to_string()
    }
}

bitflags! {
    /// Set of modifier keys held during a key event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const CTRL = 0b0001;
        const SHIFT = 0b0010;
        const ALT = 0b0100;
        const META = 0b1000;
    }
}

impl Default for Modifiers {
    fn default() -> Self {
        Self::empty()
    }
}

impl Modifiers {
    /// Iterate the held modifiers in display order (Ctrl, Shift, Alt, Meta)
    pub fn keys(self) -> impl Iterator<Item = ModifierKey> {
        ModifierKey::ALL
            .into_iter()
            .filter(move |modifier| self.contains(modifier.flag()))
    }
}

impl FromIterator<ModifierKey> for Modifiers {
    fn from_iter<I: IntoIterator<Item = ModifierKey>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Modifiers::empty(), |set, modifier| set | modifier.flag())
    }
}

/// A single modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl ModifierKey {
    /// All modifiers, in display order
    pub const ALL: [ModifierKey; 4] = [
        ModifierKey::Ctrl,
        ModifierKey::Shift,
        ModifierKey::Alt,
        ModifierKey::Meta,
    ];

    /// The flag for this modifier within a [`Modifiers`] set
    pub fn flag(self) -> Modifiers {
        match self {
            ModifierKey::Ctrl => Modifiers::CTRL,
            ModifierKey::Shift => Modifiers::SHIFT,
            ModifierKey::Alt => Modifiers::ALT,
            ModifierKey::Meta => Modifiers::META,
        }
    }

    /// The key that, pressed on its own, produces this modifier
    pub fn key(self) -> Key {
        match self {
            ModifierKey::Ctrl => Key::Ctrl,
            ModifierKey::Shift => Key::Shift,
            ModifierKey::Alt => Key::Alt,
            ModifierKey::Meta => Key::Meta,
        }
    }

    /// Position in [`ModifierKey::ALL`]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ModifierKey::Ctrl => "Ctrl",
            ModifierKey::Shift => "Shift",
            ModifierKey::Alt => "Alt",
            ModifierKey::Meta => "Meta",
        }
    }

    /// Parse a modifier name, accepting common platform synonyms
    pub fn from_name(name: &str) -> Result<Self, InvalidBinding> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ctrl" | "control" => Ok(ModifierKey::Ctrl),
            "shift" => Ok(ModifierKey::Shift),
            "alt" | "option" => Ok(ModifierKey::Alt),
            "meta" | "cmd" | "command" | "super" => Ok(ModifierKey::Meta),
            _ => Err(InvalidBinding::UnknownModifier(name.trim().to_string())),
        }
    }
}

impl fmt::Display for ModifierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A key plus the exact set of modifiers that must be held with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chord {
    modifiers: Modifiers,
    key: Key,
}

impl Chord {
    /// Build a chord, rejecting modifier keys in the key position
    pub fn new(modifiers: Modifiers, key: Key) -> Result<Self, InvalidBinding> {
        if key.as_modifier().is_some() {
            return Err(InvalidBinding::ModifierAsKey(key));
        }
        Ok(Self { modifiers, key })
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.keys() {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for Chord {
    type Err = InvalidBinding;

    /// Parse `Ctrl+Shift+A` style notation; the last segment is the key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let key = match parts.pop() {
            Some(key) if !key.is_empty() => Key::from_name(key)?,
            _ => return Err(InvalidBinding::EmptyChord),
        };

        let mut modifiers = Modifiers::empty();
        for part in parts {
            let modifier = ModifierKey::from_name(part)?;
            if modifiers.contains(modifier.flag()) {
                return Err(InvalidBinding::DuplicateModifier(modifier));
            }
            modifiers |= modifier.flag();
        }

        Chord::new(modifiers, key)
    }
}

impl TryFrom<String> for Chord {
    type Error = InvalidBinding;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Chord> for String {
    fn from(chord: Chord) -> Self {
        chord.to_string()
    }
}
