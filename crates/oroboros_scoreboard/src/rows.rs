//! # Row Store
//!
//! Ordered template rows of one scoreboard. Insertion order is display
//! order: the first row renders at the top with the highest rank.

use crate::error::{ScoreboardError, ScoreboardResult};

/// Ordered, mutable list of template rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowStore {
    rows: Vec<String>,
}

impl RowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row.
    pub fn add_row(&mut self, row: impl Into<String>) {
        self.rows.push(row.into());
    }

    /// Appends rows in order.
    pub fn add_rows<I, S>(&mut self, rows: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.extend(rows.into_iter().map(Into::into));
    }

    /// Removes every row.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Removes and returns the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is past the end.
    pub fn remove_at(&mut self, index: usize) -> ScoreboardResult<String> {
        if index >= self.rows.len() {
            return Err(ScoreboardError::RowIndexOutOfBounds {
                index,
                len: self.rows.len(),
            });
        }
        Ok(self.rows.remove(index))
    }

    /// Removes every row containing `needle`, keeping the rest in order.
    ///
    /// Returns how many rows were removed.
    pub fn remove_containing(&mut self, needle: &str) -> usize {
        let before = self.rows.len();
        self.rows.retain(|row| !row.contains(needle));
        before - self.rows.len()
    }

    /// Replaces the row at `index`.
    ///
    /// # Errors
    ///
    /// Returns error if `index` is past the end.
    pub fn set_row(&mut self, index: usize, row: impl Into<String>) -> ScoreboardResult<()> {
        let len = self.rows.len();
        let slot = self
            .rows
            .get_mut(index)
            .ok_or(ScoreboardError::RowIndexOutOfBounds { index, len })?;
        *slot = row.into();
        Ok(())
    }

    /// Row at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&str> {
        self.rows.get(index).map(String::as_str)
    }

    /// Number of rows.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterates rows top to bottom.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(String::as_str)
    }

    /// Rows as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.rows
    }
}

impl<S: Into<String>> FromIterator<S> for RowStore {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut store = Self::new();
        store.add_rows(iter);
        store
    }
}
