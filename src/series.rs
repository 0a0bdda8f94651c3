/// Parses a pipe-delimited list of numbers, e.g. `"22|18.5|31"`.
///
/// Values keep the order they were written in. Tokens that are not numbers are
/// skipped so one bad entry does not throw away the rest of a player's history.
pub fn parse_series(raw: &str) -> Vec<f64> {
    raw.split('|')
        .filter_map(|part| {
            let token = part.trim();
            if token.is_empty() {
                return None;
            }
            token.parse::<f64>().ok().filter(|v| v.is_finite())
        })
        .collect()
}
