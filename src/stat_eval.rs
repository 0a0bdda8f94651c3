use crate::audit::PlayerAuditRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseStat {
    Points,
    Rebounds,
    Assists,
    Made3s,
}

impl BaseStat {
    fn series(self, record: &PlayerAuditRecord) -> &[f64] {
        match self {
            BaseStat::Points => &record.points,
            BaseStat::Rebounds => &record.rebounds,
            BaseStat::Assists => &record.assists,
            BaseStat::Made3s => &record.made3s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatCode {
    Pts,
    Reb,
    Ast,
    Fg3m,
    Pr,
    Pa,
    Ra,
    Pra,
}

impl StatCode {
    pub fn from_code(raw: &str) -> Option<Self> {
        match canonical_stat(raw).as_str() {
            "PTS" => Some(StatCode::Pts),
            "REB" => Some(StatCode::Reb),
            "AST" => Some(StatCode::Ast),
            "FG3M" => Some(StatCode::Fg3m),
            "PR" => Some(StatCode::Pr),
            "PA" => Some(StatCode::Pa),
            "RA" => Some(StatCode::Ra),
            "PRA" => Some(StatCode::Pra),
            _ => None,
        }
    }

    pub fn components(self) -> &'static [BaseStat] {
        use BaseStat::*;
        match self {
            StatCode::Pts => &[Points],
            StatCode::Reb => &[Rebounds],
            StatCode::Ast => &[Assists],
            StatCode::Fg3m => &[Made3s],
            StatCode::Pr => &[Points, Rebounds],
            StatCode::Pa => &[Points, Assists],
            StatCode::Ra => &[Rebounds, Assists],
            StatCode::Pra => &[Points, Rebounds, Assists],
        }
    }
}

/// Uppercases a stat code and folds the spellings seen on boards into the
/// canonical codes. Unknown codes come back uppercased and untouched.
pub fn canonical_stat(raw: &str) -> String {
    let upper: String = raw
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase();
    let mapped = match upper.as_str() {
        "POINTS" | "PT" => "PTS",
        "REBOUNDS" | "REBS" => "REB",
        "ASSISTS" | "ASTS" => "AST",
        "3PM" | "3PTM" | "FG3" | "3PT" | "THREES" => "FG3M",
        "PTS+REB" | "P+R" => "PR",
        "PTS+AST" | "P+A" => "PA",
        "REB+AST" | "R+A" => "RA",
        "PTS+REB+AST" | "P+R+A" => "PRA",
        other => other,
    };
    mapped.to_string()
}

/// The per-game series a leg's stat refers to. Combination stats are summed
/// element-wise over the indices every component has; if any component is
/// empty the result is empty. Unknown stats and a missing record give an empty
/// series.
pub fn derived_series(record: Option<&PlayerAuditRecord>, stat: &str) -> Vec<f64> {
    let (Some(record), Some(code)) = (record, StatCode::from_code(stat)) else {
        return Vec::new();
    };
    let parts: Vec<&[f64]> = code
        .components()
        .iter()
        .map(|base| base.series(record))
        .collect();
    let Some(len) = parts.iter().map(|s| s.len()).min() else {
        return Vec::new();
    };
    (0..len)
        .map(|idx| parts.iter().map(|s| s[idx]).sum())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PlayerAuditRecord {
        PlayerAuditRecord {
            name: "p".into(),
            points: vec![10.0, 12.0, 9.0],
            rebounds: vec![5.0, 6.0],
            assists: vec![2.0, 3.0, 4.0],
            made3s: Vec::new(),
        }
    }

    #[test]
    fn combination_truncates_to_shortest() {
        let r = record();
        assert_eq!(derived_series(Some(&r), "PR"), vec![15.0, 18.0]);
        assert_eq!(derived_series(Some(&r), "pa"), vec![12.0, 15.0, 13.0]);
        assert_eq!(derived_series(Some(&r), "PRA"), vec![17.0, 21.0]);
    }

    #[test]
    fn empty_component_empties_result() {
        let mut r = record();
        r.rebounds.clear();
        assert!(derived_series(Some(&r), "RA").is_empty());
        assert_eq!(derived_series(Some(&r), "AST"), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn unknown_stat_or_record() {
        let r = record();
        assert!(derived_series(Some(&r), "BLK").is_empty());
        assert!(derived_series(None, "PTS").is_empty());
    }

    #[test]
    fn aliases_fold() {
        assert_eq!(canonical_stat("pts + reb + ast"), "PRA");
        assert_eq!(canonical_stat("threes"), "FG3M");
        assert_eq!(canonical_stat("blk"), "BLK");
        assert_eq!(StatCode::from_code("r+a"), Some(StatCode::Ra));
    }
}
