use crate::leg_text::Direction;

/// Counts games in `series` that beat `line` in `direction`.
///
/// `None` means there is nothing to evaluate: no games, or a direction other
/// than over/under. A value equal to the line is a push and never counts.
pub fn count_hits(series: &[f64], direction: &Direction, line: f64) -> Option<u32> {
    if series.is_empty() || !line.is_finite() {
        return None;
    }
    let hit: fn(f64, f64) -> bool = match direction {
        Direction::Over => |v, line| v > line,
        Direction::Under => |v, line| v < line,
        Direction::Other(_) => return None,
    };
    Some(series.iter().filter(|v| hit(**v, line)).count() as u32)
}
