//! # Legacy Color Codes
//!
//! Sidebar text is colored with two-character markers: the section sign
//! followed by a code (`§c` is red). Authors write `&c` in titles, which
//! [`colorize`] translates.

use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;

/// The marker character that starts a color code.
pub const COLOR_CHAR: char = '§';

/// The author-facing marker translated by [`colorize`].
pub const ALT_COLOR_CHAR: char = '&';

/// A legacy chat color or format code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChatColor {
    /// `§0`
    Black,
    /// `§1`
    DarkBlue,
    /// `§2`
    DarkGreen,
    /// `§3`
    DarkAqua,
    /// `§4`
    DarkRed,
    /// `§5`
    DarkPurple,
    /// `§6`
    Gold,
    /// `§7`
    Gray,
    /// `§8`
    DarkGray,
    /// `§9`
    Blue,
    /// `§a`
    Green,
    /// `§b`
    Aqua,
    /// `§c`
    Red,
    /// `§d`
    LightPurple,
    /// `§e`
    Yellow,
    /// `§f`
    White,
    /// `§k` (obfuscated)
    Magic,
    /// `§l`
    Bold,
    /// `§m`
    Strikethrough,
    /// `§n`
    Underline,
    /// `§o`
    Italic,
    /// `§r`
    Reset,
}

impl ChatColor {
    /// The sixteen real colors, excluding format codes.
    pub const COLORS: [Self; 16] = [
        Self::Black,
        Self::DarkBlue,
        Self::DarkGreen,
        Self::DarkAqua,
        Self::DarkRed,
        Self::DarkPurple,
        Self::Gold,
        Self::Gray,
        Self::DarkGray,
        Self::Blue,
        Self::Green,
        Self::Aqua,
        Self::Red,
        Self::LightPurple,
        Self::Yellow,
        Self::White,
    ];

    /// Returns the code character following [`COLOR_CHAR`].
    #[must_use]
    pub const fn code(self) -> char {
        match self {
            Self::Black => '0',
            Self::DarkBlue => '1',
            Self::DarkGreen => '2',
            Self::DarkAqua => '3',
            Self::DarkRed => '4',
            Self::DarkPurple => '5',
            Self::Gold => '6',
            Self::Gray => '7',
            Self::DarkGray => '8',
            Self::Blue => '9',
            Self::Green => 'a',
            Self::Aqua => 'b',
            Self::Red => 'c',
            Self::LightPurple => 'd',
            Self::Yellow => 'e',
            Self::White => 'f',
            Self::Magic => 'k',
            Self::Bold => 'l',
            Self::Strikethrough => 'm',
            Self::Underline => 'n',
            Self::Italic => 'o',
            Self::Reset => 'r',
        }
    }

    /// Parses a code character, case-insensitive.
    #[must_use]
    pub fn from_code(code: char) -> Option<Self> {
        let code = code.to_ascii_lowercase();
        Self::COLORS
            .iter()
            .chain(&[
                Self::Magic,
                Self::Bold,
                Self::Strikethrough,
                Self::Underline,
                Self::Italic,
                Self::Reset,
            ])
            .copied()
            .find(|color| color.code() == code)
    }

    /// Returns true for format codes (bold, italic, ...), false for colors.
    #[must_use]
    pub const fn is_format(self) -> bool {
        matches!(
            self,
            Self::Magic
                | Self::Bold
                | Self::Strikethrough
                | Self::Underline
                | Self::Italic
                | Self::Reset
        )
    }

    /// Picks one of the sixteen colors uniformly.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        *Self::COLORS.choose(rng).unwrap_or(&Self::White)
    }
}

impl fmt::Display for ChatColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COLOR_CHAR}{}", self.code())
    }
}

/// Translates `&x` markers into `§x` for every valid code `x`.
///
/// Unknown codes and a trailing `&` are left untouched.
#[must_use]
pub fn colorize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == ALT_COLOR_CHAR {
            if let Some(color) = chars.peek().copied().and_then(ChatColor::from_code) {
                chars.next();
                out.push(COLOR_CHAR);
                out.push(color.code());
                continue;
            }
        }
        out.push(c);
    }

    out
}

/// Removes `&x` and `§x` markers for every valid code `x`.
///
/// Used for text that leaves the sidebar, such as log fields.
#[must_use]
pub fn strip_codes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if (c == ALT_COLOR_CHAR || c == COLOR_CHAR)
            && chars.peek().copied().and_then(ChatColor::from_code).is_some()
        {
            chars.next();
            continue;
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_display_uses_section_sign() {
        assert_eq!(ChatColor::Red.to_string(), "§c");
        assert_eq!(ChatColor::Black.to_string(), "§0");
        assert_eq!(ChatColor::Reset.to_string(), "§r");
    }

    #[test]
    fn test_from_code_roundtrip() {
        for color in ChatColor::COLORS {
            assert_eq!(ChatColor::from_code(color.code()), Some(color));
        }
        assert_eq!(ChatColor::from_code('L'), Some(ChatColor::Bold));
        assert_eq!(ChatColor::from_code('z'), None);
    }

    #[test]
    fn test_random_never_picks_format() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            assert!(!ChatColor::random(&mut rng).is_format());
        }
    }

    #[test]
    fn test_colorize() {
        assert_eq!(colorize("&6&lLOBBY"), "§6§lLOBBY");
        assert_eq!(colorize("&CRed"), "§cRed");
        assert_eq!(colorize("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(colorize("&zKeep"), "&zKeep");
        assert_eq!(colorize("trailing&"), "trailing&");
    }

    #[test]
    fn test_strip_codes() {
        assert_eq!(strip_codes("&7Oroboros //"), "Oroboros //");
        assert_eq!(strip_codes("§6§lLOBBY"), "LOBBY");
        assert_eq!(strip_codes("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(strip_codes("&zKeep"), "&zKeep");
        assert_eq!(strip_codes(&colorize("&aArena &8//")), "Arena //");
    }
}
