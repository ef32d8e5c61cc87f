//! Thumbnail modes and anchors.
//!
//! A mode token selects one of three families:
//!
//! | Family | Tokens |
//! |--------|--------|
//! | Fit    | `m` |
//! | Pad    | `w`, `wc`, `wlt wlc wlb wrt wrc wrb wct wcc wcb` |
//! | Crop   | `c`, `lt lc lb rt rc rb ct cc cb` |
//!
//! In the two-letter anchor suffix the first letter is horizontal
//! (`l`/`c`/`r`) and the second vertical (`t`/`c`/`b`). Bare `w`, `wc` and
//! `c` are aliases for the centered anchor.

use std::fmt;

use crate::error::TransformError;

/// Horizontal component of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

/// Vertical component of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAnchor {
    Top,
    Center,
    Bottom,
}

impl HorizontalAnchor {
    fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b'l' => Some(Self::Left),
            b'c' => Some(Self::Center),
            b'r' => Some(Self::Right),
            _ => None,
        }
    }

    const fn letter(self) -> char {
        match self {
            Self::Left => 'l',
            Self::Center => 'c',
            Self::Right => 'r',
        }
    }

    /// Offset along this axis for the given amount of slack.
    ///
    /// Center truncates toward zero.
    #[inline]
    pub const fn offset(self, slack: u32) -> u32 {
        match self {
            Self::Left => 0,
            Self::Center => slack / 2,
            Self::Right => slack,
        }
    }
}

impl VerticalAnchor {
    fn from_letter(letter: u8) -> Option<Self> {
        match letter {
            b't' => Some(Self::Top),
            b'c' => Some(Self::Center),
            b'b' => Some(Self::Bottom),
            _ => None,
        }
    }

    const fn letter(self) -> char {
        match self {
            Self::Top => 't',
            Self::Center => 'c',
            Self::Bottom => 'b',
        }
    }

    /// Offset along this axis for the given amount of slack.
    #[inline]
    pub const fn offset(self, slack: u32) -> u32 {
        match self {
            Self::Top => 0,
            Self::Center => slack / 2,
            Self::Bottom => slack,
        }
    }
}

/// One of the nine positions of the 3x3 placement grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
    pub horizontal: HorizontalAnchor,
    pub vertical: VerticalAnchor,
}

impl Anchor {
    pub const CENTER: Anchor = Anchor::new(HorizontalAnchor::Center, VerticalAnchor::Center);

    pub const fn new(horizontal: HorizontalAnchor, vertical: VerticalAnchor) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    /// Parse a two-letter anchor such as `lt` or `cb`.
    fn parse(letters: &str) -> Option<Self> {
        match letters.as_bytes() {
            [h, v] => Some(Self::new(
                HorizontalAnchor::from_letter(*h)?,
                VerticalAnchor::from_letter(*v)?,
            )),
            _ => None,
        }
    }

    /// Offsets `(x, y)` for the given horizontal and vertical slack.
    pub const fn offsets(&self, slack_x: u32, slack_y: u32) -> (u32, u32) {
        (
            self.horizontal.offset(slack_x),
            self.vertical.offset(slack_y),
        )
    }
}

impl fmt::Display for Anchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.horizontal.letter(), self.vertical.letter())
    }
}

/// Thumbnail mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Scale to fit inside the target box, no padding or cropping.
    Fit,
    /// Fit, then place onto a target-sized canvas filled with the background color.
    Pad(Anchor),
    /// Scale to cover the target box, then cut a target-sized window.
    Crop(Anchor),
}

impl Mode {
    /// Parse a mode token.
    pub fn parse(token: &str) -> Result<Self, TransformError> {
        let invalid = || TransformError::InvalidMode {
            mode: token.to_string(),
        };

        match token {
            "m" => Ok(Mode::Fit),
            "w" | "wc" => Ok(Mode::Pad(Anchor::CENTER)),
            "c" => Ok(Mode::Crop(Anchor::CENTER)),
            _ => {
                if let Some(rest) = token.strip_prefix('w') {
                    Anchor::parse(rest).map(Mode::Pad).ok_or_else(invalid)
                } else {
                    Anchor::parse(token).map(Mode::Crop).ok_or_else(invalid)
                }
            }
        }
    }

    /// Canonical token for this mode (aliases collapse onto one spelling).
    pub fn token(&self) -> String {
        match self {
            Mode::Fit => "m".to_string(),
            Mode::Pad(anchor) => format!("w{}", anchor),
            Mode::Crop(anchor) => anchor.to_string(),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}
