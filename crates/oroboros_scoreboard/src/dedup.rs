//! # Duplicate Line Resolver
//!
//! Sidebar displays key a line's identity by its text, so two equal lines
//! in one frame collapse into one. Colliding lines get random color
//! markers appended until they differ or the length budget runs out.
//!
//! ## Known Limit
//!
//! Disambiguation is best-effort. Each marker adds two characters, so a
//! line already near the budget (or capped to 16 characters on reduced
//! displays) may receive no marker at all and still collide. Such
//! residual duplicates are accepted, not reported.

use std::collections::HashSet;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::ChatColor;
use crate::{MAX_LINE_LENGTH, REDUCED_LINE_LENGTH};

/// Display capability tier of the target surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    /// Modern clients: 40 characters per line.
    #[default]
    Full,
    /// Legacy clients: 16 characters per line.
    Reduced,
}

impl CapabilityTier {
    /// Returns true on the reduced tier.
    #[inline]
    #[must_use]
    pub const fn is_reduced(self) -> bool {
        matches!(self, Self::Reduced)
    }

    /// Maximum rendered line length for this tier.
    #[inline]
    #[must_use]
    pub const fn max_line_length(self) -> usize {
        match self {
            Self::Full => MAX_LINE_LENGTH,
            Self::Reduced => REDUCED_LINE_LENGTH,
        }
    }
}

/// Returns the first `max` characters of `text`.
///
/// Counts Unicode scalar values, so `§` is one character.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

/// Lines already emitted in the current frame, in emission order.
#[derive(Debug, Default, Clone)]
pub struct FrameLines {
    /// Emitted lines, top to bottom.
    lines: Vec<String>,
    /// Membership index over `lines`.
    seen: HashSet<String>,
}

impl FrameLines {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty frame sized for `rows` lines.
    #[must_use]
    pub fn with_capacity(rows: usize) -> Self {
        Self {
            lines: Vec::with_capacity(rows),
            seen: HashSet::with_capacity(rows),
        }
    }

    /// Number of lines emitted so far.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if nothing was emitted yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns true if `line` was already emitted this frame.
    #[inline]
    #[must_use]
    pub fn contains(&self, line: &str) -> bool {
        self.seen.contains(line)
    }

    /// Emitted lines in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consumes the frame, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    /// Makes `candidate` unique within this frame and records it.
    ///
    /// 1. Truncate to `max_len` (and to 16 on the reduced tier).
    /// 2. On collision, append one random color marker per line already
    ///    emitted, stopping once the length reaches `max_len`.
    /// 3. Re-apply the caps and record the result.
    ///
    /// The returned line may still collide; see the module docs.
    pub fn disambiguate<R: Rng + ?Sized>(
        &mut self,
        candidate: &str,
        max_len: usize,
        tier: CapabilityTier,
        rng: &mut R,
    ) -> String {
        let mut line = cap_line(candidate, max_len, tier).to_owned();

        if self.contains(&line) {
            let mut len = line.chars().count();
            for _ in 0..self.lines.len() {
                if len >= max_len {
                    break;
                }
                let marker = ChatColor::random(rng);
                line.push_str(&marker.to_string());
                len += 2;
            }
            line = cap_line(&line, max_len, tier).to_owned();
        }

        self.seen.insert(line.clone());
        self.lines.push(line.clone());
        line
    }
}

/// Applies the budget cap, then the reduced-tier cap.
fn cap_line(text: &str, max_len: usize, tier: CapabilityTier) -> &str {
    let text = truncate_chars(text, max_len);
    if tier.is_reduced() {
        truncate_chars(text, REDUCED_LINE_LENGTH)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn test_truncate_chars_counts_scalars() {
        assert_eq!(truncate_chars("§c§lHello", 4), "§c§l");
        assert_eq!(truncate_chars("short", 40), "short");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_unique_lines_untouched() {
        let mut frame = FrameLines::new();
        let mut rng = rng();
        assert_eq!(frame.disambiguate("A", 40, CapabilityTier::Full, &mut rng), "A");
        assert_eq!(frame.disambiguate("B", 40, CapabilityTier::Full, &mut rng), "B");
        assert_eq!(frame.lines(), ["A", "B"]);
    }

    #[test]
    fn test_triple_collision() {
        let mut frame = FrameLines::new();
        let mut rng = rng();

        let first = frame.disambiguate("A", 40, CapabilityTier::Full, &mut rng);
        let second = frame.disambiguate("A", 40, CapabilityTier::Full, &mut rng);
        let third = frame.disambiguate("A", 40, CapabilityTier::Full, &mut rng);

        assert_eq!(first, "A");
        // One marker per previously emitted line
        assert_eq!(second.chars().count(), 3);
        assert_eq!(third.chars().count(), 5);
        assert!(second.starts_with('A') && third.starts_with('A'));
        assert_ne!(second, third);
    }

    #[test]
    fn test_empty_rows_become_distinct() {
        let mut frame = FrameLines::new();
        let mut rng = rng();
        for _ in 0..10 {
            frame.disambiguate("", 40, CapabilityTier::Full, &mut rng);
        }
        let unique: HashSet<_> = frame.lines().iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_full_tier_budget() {
        let mut frame = FrameLines::new();
        let mut rng = rng();
        let long = "x".repeat(60);
        for _ in 0..5 {
            let line = frame.disambiguate(&long, 40, CapabilityTier::Full, &mut rng);
            assert!(line.chars().count() <= 40);
        }
    }

    #[test]
    fn test_marker_does_not_overflow_budget() {
        let mut frame = FrameLines::new();
        let mut rng = rng();
        let almost = "y".repeat(39);
        frame.disambiguate(&almost, 40, CapabilityTier::Full, &mut rng);
        let line = frame.disambiguate(&almost, 40, CapabilityTier::Full, &mut rng);
        assert_eq!(line.chars().count(), 40);
    }

    #[test]
    fn test_reduced_tier_cap() {
        let mut frame = FrameLines::new();
        let mut rng = rng();
        let line = frame.disambiguate("Players online: 120", 40, CapabilityTier::Reduced, &mut rng);
        assert_eq!(line, "Players online: ");

        let short = frame.disambiguate("Hi", 40, CapabilityTier::Reduced, &mut rng);
        let again = frame.disambiguate("Hi", 40, CapabilityTier::Reduced, &mut rng);
        assert_eq!(short, "Hi");
        assert!(again.chars().count() <= 16);
        assert_ne!(short, again);
    }

    #[test]
    fn test_reduced_tier_residual_collision() {
        // A full 16-char line has no room left for markers.
        let mut frame = FrameLines::new();
        let mut rng = rng();
        let row = "0123456789abcdef";
        let a = frame.disambiguate(row, 40, CapabilityTier::Reduced, &mut rng);
        let b = frame.disambiguate(row, 40, CapabilityTier::Reduced, &mut rng);
        assert_eq!(a, b);
        assert_eq!(frame.len(), 2);
    }

    #[test]
    fn test_tier_lengths() {
        assert_eq!(CapabilityTier::Full.max_line_length(), 40);
        assert_eq!(CapabilityTier::Reduced.max_line_length(), 16);
        assert_eq!(CapabilityTier::default(), CapabilityTier::Full);
    }
}
