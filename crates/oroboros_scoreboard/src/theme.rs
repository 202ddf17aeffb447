//! # Theme Engine
//!
//! Colors `key: value` rows with one or two colors.
//!
//! ```text
//! primary only:        §c + "Players: 5"
//! primary + secondary: §c + "Players" + §f + ": 5"
//! ```
//!
//! The secondary color starts at the separator, so the colon takes the
//! value's color. Only the first `:` splits the row: `"Time: 12:30"` keeps
//! `" 12:30"` as its value.

use std::borrow::Cow;

use crate::color::ChatColor;

/// Separator between key and value in a themed row.
pub const KEY_SEPARATOR: char = ':';

/// One- or two-color theme for `key: value` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Theme {
    /// Color of the whole row, or of the key when `secondary` is set.
    pub primary: ChatColor,
    /// Color of the value part.
    pub secondary: Option<ChatColor>,
}

impl Theme {
    /// Creates a theme.
    #[must_use]
    pub const fn new(primary: ChatColor, secondary: Option<ChatColor>) -> Self {
        Self { primary, secondary }
    }

    /// Creates a single-color theme.
    #[must_use]
    pub const fn single(primary: ChatColor) -> Self {
        Self::new(primary, None)
    }

    /// Applies this theme to one row.
    #[must_use]
    pub fn apply<'a>(&self, row: &'a str) -> Cow<'a, str> {
        let Some((key, value)) = row.split_once(KEY_SEPARATOR) else {
            return Cow::Borrowed(row);
        };

        match self.secondary {
            None => Cow::Owned(format!("{}{row}", self.primary)),
            Some(secondary) => Cow::Owned(format!(
                "{}{key}{secondary}{KEY_SEPARATOR}{value}",
                self.primary
            )),
        }
    }
}

/// Applies `theme` to `row`, or returns `row` unchanged without a theme.
#[inline]
#[must_use]
pub fn apply_theme<'a>(row: &'a str, theme: Option<&Theme>) -> Cow<'a, str> {
    match theme {
        Some(theme) => theme.apply(row),
        None => Cow::Borrowed(row),
    }
}
