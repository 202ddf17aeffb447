//! # Row Rendering Pipeline
//!
//! Turns template rows into sidebar lines for one frame.
//!
//! ```text
//! row ──> VariableResolver ──> Theme ──> FrameLines::disambiguate ──> set_line(rank)
//! ```
//!
//! Rows are emitted top to bottom; the first row gets rank `rows.len()`,
//! the last gets rank 1.

use rand::Rng;

use crate::dedup::{CapabilityTier, FrameLines};
use crate::error::RenderError;
use crate::rows::RowStore;
use crate::sink::RenderSink;
use crate::theme::{apply_theme, Theme};
use crate::variables::VariableResolver;
use crate::MAX_LINE_LENGTH;

/// Per-board inputs of one frame.
pub struct FrameContext<'a> {
    /// Placeholder substitution.
    pub resolver: &'a dyn VariableResolver,
    /// Optional key/value coloring.
    pub theme: Option<&'a Theme>,
    /// Display tier of the board's viewers.
    pub tier: CapabilityTier,
}

/// Renders `rows` into `sink` and returns the emitted lines.
///
/// Lines are pairwise distinct except for the residual collisions
/// documented in [`crate::dedup`], and never longer than the tier allows.
///
/// # Errors
///
/// Returns the first resolver failure. Lines emitted before the failing
/// row have already reached the sink.
pub fn render_frame<R: Rng + ?Sized>(
    rows: &RowStore,
    ctx: &FrameContext<'_>,
    rng: &mut R,
    sink: &mut dyn RenderSink,
) -> Result<FrameLines, RenderError> {
    let count = rows.len();
    let mut frame = FrameLines::with_capacity(count);

    for (index, row) in rows.iter().enumerate() {
        let rank = u32::try_from(count - index).unwrap_or(u32::MAX);

        let resolved = ctx.resolver.resolve(row)?;
        let themed = apply_theme(&resolved, ctx.theme);
        let line = frame.disambiguate(&themed, MAX_LINE_LENGTH, ctx.tier, rng);

        tracing::trace!(rank, line = %line, "sidebar line");
        sink.set_line(rank, &line);
    }

    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::ChatColor;
    use crate::sink::MemorySink;
    use crate::variables::{IdentityResolver, PlaceholderResolver};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn context<'a>(
        resolver: &'a dyn VariableResolver,
        theme: Option<&'a Theme>,
        tier: CapabilityTier,
    ) -> FrameContext<'a> {
        FrameContext {
            resolver,
            theme,
            tier,
        }
    }

    #[test]
    fn test_ranks_descend_from_row_count() {
        let rows: RowStore = ["Players: 3", "Mode: solo", "Map: Arena"].into_iter().collect();
        let inspect = MemorySink::new();
        let mut sink = inspect.clone();
        let mut rng = StdRng::seed_from_u64(1);

        let ctx = context(&IdentityResolver, None, CapabilityTier::Full);
        let frame = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap();

        assert_eq!(frame.lines(), ["Players: 3", "Mode: solo", "Map: Arena"]);
        assert_eq!(
            inspect.ranked_lines(),
            [
                (3, "Players: 3".to_string()),
                (2, "Mode: solo".to_string()),
                (1, "Map: Arena".to_string()),
            ]
        );
    }

    #[test]
    fn test_variables_then_theme() {
        let vars = PlaceholderResolver::new();
        vars.set("online", "5");
        let theme = Theme::new(ChatColor::Red, Some(ChatColor::White));
        let rows: RowStore = ["Players: {online}"].into_iter().collect();
        let mut sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(1);

        let ctx = context(&vars, Some(&theme), CapabilityTier::Full);
        let frame = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap();

        assert_eq!(frame.lines(), ["§cPlayers§f: 5"]);
    }

    #[test]
    fn test_duplicates_distinct_and_bounded() {
        let rows: RowStore = ["A", "A", "A", "", "", "B"].into_iter().collect();
        let mut sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(9);

        let ctx = context(&IdentityResolver, None, CapabilityTier::Full);
        let frame = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap();

        let lines = frame.lines();
        assert_eq!(lines.len(), rows.len());
        let unique: HashSet<_> = lines.iter().collect();
        assert_eq!(unique.len(), lines.len());
        assert!(lines[1].len() > 1 && lines[2].len() > 1);
        assert!(lines.iter().all(|l| l.chars().count() <= 40));
    }

    #[test]
    fn test_reduced_tier_bound() {
        let rows: RowStore = ["Very long row that overflows", "Another long overflowing row"]
            .into_iter()
            .collect();
        let mut sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(3);

        let ctx = context(&IdentityResolver, None, CapabilityTier::Reduced);
        let frame = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap();

        assert!(frame.lines().iter().all(|l| l.chars().count() <= 16));
    }

    #[test]
    fn test_resolver_failure_aborts_frame() {
        let vars = PlaceholderResolver::new().strict();
        let rows: RowStore = ["ok", "Kills: {kills}", "never"].into_iter().collect();
        let inspect = MemorySink::new();
        let mut sink = inspect.clone();
        let mut rng = StdRng::seed_from_u64(1);

        let ctx = context(&vars, None, CapabilityTier::Full);
        let err = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap_err();

        assert!(matches!(err, RenderError::Variable { .. }));
        assert_eq!(inspect.lines(), ["ok"]);
    }

    #[test]
    fn test_empty_rows() {
        let rows = RowStore::new();
        let mut sink = MemorySink::new();
        let mut rng = StdRng::seed_from_u64(1);

        let ctx = context(&IdentityResolver, None, CapabilityTier::Full);
        let frame = render_frame(&rows, &ctx, &mut rng, &mut sink).unwrap();
        assert!(frame.is_empty());
    }
}
