//! Deterministic user color assignment.
//!
//! Every client computes a peer's color locally from the peer's user id, so
//! the color never needs to travel on the wire and never depends on state.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// Fixed palette of display colors, indexed by [`color_of`].
pub const PALETTE: [&str; 8] = [
    "#3b82f6", // blue
    "#ef4444", // red
    "#10b981", // green
    "#f59e0b", // amber
    "#8b5cf6", // purple
    "#ec4899", // pink
    "#06b6d4", // cyan
    "#84cc16", // lime
];

/// Map a user id to its palette color.
///
/// The index is the sum of the first two UTF-16 code units modulo the palette
/// size. Ids shorter than two units count the missing units as zero.
#[must_use]
pub fn color_of(user_id: &str) -> &'static str {
    let mut units = user_id.encode_utf16();
    let first = usize::from(units.next().unwrap_or(0));
    let second = usize::from(units.next().unwrap_or(0));
    PALETTE[(first + second) % PALETTE.len()]
}

/// Whether `color` is one of the palette entries.
#[cfg(test)]
pub(crate) fn is_palette_color(color: &str) -> bool {
    PALETTE.contains(&color)
}
