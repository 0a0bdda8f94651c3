use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

use crate::stat_eval::canonical_stat;

static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[\s*id\s*:\s*(\d+)\s*\]").expect("valid id regex"));

static LEG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        ^\s*(?P<player>.+?)
        \s+(?P<dir>over|under)
        \s+(?P<stat>[a-z0-9+]+)
        \s+(?P<line>[+-]?(?:\d+(?:\.\d*)?|\.\d+))
        (?:\s*\(\s*(?P<tier>[^()]*?)\s*\))?
        ",
    )
    .expect("valid leg regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    Over,
    Under,
    /// Anything else upstream sent us, uppercased. Never evaluated.
    Other(String),
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        let upper = raw.trim().to_ascii_uppercase();
        match upper.as_str() {
            "" => None,
            "OVER" | "O" | "MORE" | "HIGHER" => Some(Direction::Over),
            "UNDER" | "U" | "LESS" | "LOWER" => Some(Direction::Under),
            _ => Some(Direction::Other(upper)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Direction::Over => "OVER",
            Direction::Under => "UNDER",
            Direction::Other(raw) => raw.as_str(),
        }
    }
}

impl Serialize for Direction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One wager leg. Every structured field is optional: a leg that could not be
/// parsed keeps only its `raw_text`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedLeg {
    pub id: Option<u64>,
    pub player: Option<String>,
    pub direction: Option<Direction>,
    pub stat: Option<String>,
    pub line: Option<f64>,
    pub tier: Option<String>,
    pub raw_text: String,
}

impl ParsedLeg {
    pub fn unparsed(raw: &str) -> Self {
        Self {
            raw_text: raw.to_string(),
            ..Default::default()
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.player.is_some()
    }
}

/// Parses `<player> <OVER|UNDER> <STAT> <line> [(<TIER>)] [[id:<n>]]`.
///
/// The id tag may sit anywhere in the text. Input that does not match comes
/// back as [`ParsedLeg::unparsed`].
pub fn parse_leg_text(raw: &str) -> ParsedLeg {
    let id = ID_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok());
    let body = ID_RE.replace_all(raw, " ");

    let Some(caps) = LEG_RE.captures(&body) else {
        return ParsedLeg::unparsed(raw);
    };
    let (Some(player), Some(dir), Some(stat), Some(line)) = (
        caps.name("player"),
        caps.name("dir"),
        caps.name("stat"),
        caps.name("line"),
    ) else {
        return ParsedLeg::unparsed(raw);
    };
    let Some(line) = line.as_str().parse::<f64>().ok().filter(|v| v.is_finite()) else {
        return ParsedLeg::unparsed(raw);
    };
    let player = player.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
    if player.is_empty() {
        return ParsedLeg::unparsed(raw);
    }

    let tier = caps
        .name("tier")
        .map(|m| m.as_str().trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty());

    ParsedLeg {
        id,
        player: Some(player),
        direction: Direction::parse(dir.as_str()),
        stat: Some(canonical_stat(stat.as_str())),
        line: Some(line),
        tier,
        raw_text: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_leg() {
        let leg = parse_leg_text("Jaren Jackson OVER PRA 22.5 (GOBLIN) [id:9805821]");
        assert_eq!(leg.player.as_deref(), Some("Jaren Jackson"));
        assert_eq!(leg.direction, Some(Direction::Over));
        assert_eq!(leg.stat.as_deref(), Some("PRA"));
        assert_eq!(leg.line, Some(22.5));
        assert_eq!(leg.tier.as_deref(), Some("GOBLIN"));
        assert_eq!(leg.id, Some(9805821));
    }

    #[test]
    fn lowercase_and_no_tier() {
        let leg = parse_leg_text("  De'Aaron  Fox under pts 24 ");
        assert_eq!(leg.player.as_deref(), Some("De'Aaron Fox"));
        assert_eq!(leg.direction, Some(Direction::Under));
        assert_eq!(leg.stat.as_deref(), Some("PTS"));
        assert_eq!(leg.line, Some(24.0));
        assert!(leg.tier.is_none());
        assert!(leg.id.is_none());
    }

    #[test]
    fn id_can_lead() {
        let leg = parse_leg_text("[id:42] Josh Hart OVER REB 8.5");
        assert_eq!(leg.id, Some(42));
        assert_eq!(leg.player.as_deref(), Some("Josh Hart"));
    }

    #[test]
    fn player_containing_over_prefix() {
        let leg = parse_leg_text("Kelly Oubre Overton OVER 3PM 1.5 (demon)");
        assert_eq!(leg.player.as_deref(), Some("Kelly Oubre Overton"));
        assert_eq!(leg.stat.as_deref(), Some("FG3M"));
        assert_eq!(leg.tier.as_deref(), Some("DEMON"));
    }

    #[test]
    fn garbage_keeps_raw_text() {
        let leg = parse_leg_text("not a leg at all");
        assert!(!leg.is_parsed());
        assert!(leg.id.is_none());
        assert_eq!(leg.raw_text, "not a leg at all");

        let no_line = parse_leg_text("Josh Hart OVER REB lots [id:7]");
        assert!(!no_line.is_parsed());
        assert!(no_line.id.is_none());
    }

    #[test]
    fn direction_parse_variants() {
        assert_eq!(Direction::parse("over"), Some(Direction::Over));
        assert_eq!(Direction::parse("Under"), Some(Direction::Under));
        assert_eq!(Direction::parse("push"), Some(Direction::Other("PUSH".into())));
        assert_eq!(Direction::parse("  "), None);
    }
}
