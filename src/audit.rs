use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::series::parse_series;

/// Recent box-score history for one player. Each series keeps the order the
/// audit file wrote it in; nothing downstream depends on that order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayerAuditRecord {
    pub name: String,
    pub points: Vec<f64>,
    pub rebounds: Vec<f64>,
    pub assists: Vec<f64>,
    pub made3s: Vec<f64>,
}

/// One row of the audit table as it appears on disk.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditRow {
    #[serde(default)]
    pub resolved_player: Option<String>,
    #[serde(default)]
    pub board_player: Option<String>,
    #[serde(default)]
    pub last5_pts: Option<String>,
    #[serde(default)]
    pub last5_reb: Option<String>,
    #[serde(default)]
    pub last5_ast: Option<String>,
    #[serde(default)]
    pub last5_fg3m: Option<String>,
}

impl AuditRow {
    fn to_record(&self, name: &str) -> PlayerAuditRecord {
        let series = |raw: &Option<String>| raw.as_deref().map(parse_series).unwrap_or_default();
        PlayerAuditRecord {
            name: name.to_string(),
            points: series(&self.last5_pts),
            rebounds: series(&self.last5_reb),
            assists: series(&self.last5_ast),
            made3s: series(&self.last5_fg3m),
        }
    }
}

/// Player name -> audit record. Built once per run and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct AuditIndex {
    records: Vec<PlayerAuditRecord>,
    by_key: HashMap<String, usize>,
}

impl AuditIndex {
    pub fn from_rows<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = &'a AuditRow>,
    {
        let mut index = Self::default();
        for row in rows {
            index.insert_row(row);
        }
        index
    }

    fn insert_row(&mut self, row: &AuditRow) {
        let resolved = non_blank(row.resolved_player.as_deref());
        let board = non_blank(row.board_player.as_deref());
        let Some(row_name) = resolved.or(board) else {
            return;
        };
        let preferred = name_keys(row_name);
        if preferred.is_empty() {
            return;
        }
        let aliases = board
            .filter(|b| *b != row_name)
            .map(name_keys)
            .unwrap_or_default();

        // First write wins: an already indexed player keeps its record, and the
        // row only contributes alias keys nobody has claimed yet.
        let existing = preferred.iter().find_map(|k| self.by_key.get(k).copied());
        let slot = match existing {
            Some(slot) => {
                debug!(player = %row_name, "duplicate audit row ignored");
                slot
            }
            None => {
                self.records.push(row.to_record(row_name));
                self.records.len() - 1
            }
        };
        for key in preferred.into_iter().chain(aliases) {
            self.by_key.entry(key).or_insert(slot);
        }
    }

    pub fn get(&self, player: &str) -> Option<&PlayerAuditRecord> {
        let primary = normalize_name(player);
        if primary.is_empty() {
            return None;
        }
        if let Some(slot) = self.by_key.get(&primary) {
            return self.records.get(*slot);
        }
        let alpha = alpha_key(&primary);
        if alpha.is_empty() {
            return None;
        }
        self.by_key.get(&alpha).and_then(|slot| self.records.get(*slot))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trim, lowercase and collapse whitespace runs to single spaces.
pub fn normalize_name(input: &str) -> String {
    input
        .split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Looser key: the normalized name with everything but letters removed, so
/// "Jaren Jackson Jr." and "jaren jackson jr" meet.
pub fn alpha_key(normalized: &str) -> String {
    normalized.chars().filter(|c| c.is_alphabetic()).collect()
}

fn name_keys(name: &str) -> Vec<String> {
    let primary = normalize_name(name);
    if primary.is_empty() {
        return Vec::new();
    }
    let alpha = alpha_key(&primary);
    if alpha.is_empty() {
        vec![primary]
    } else {
        vec![primary, alpha]
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub fn read_audit_rows<R: Read>(rdr: R) -> Result<Vec<AuditRow>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<AuditRow>() {
        match result {
            Ok(row) => rows.push(row),
            Err(err) => warn!("skipping malformed audit row: {err}"),
        }
    }
    Ok(rows)
}

pub fn load_audit_csv_path(path: &Path) -> Result<AuditIndex> {
    let file = File::open(path).with_context(|| format!("open audit csv {}", path.display()))?;
    let rows =
        read_audit_rows(file).with_context(|| format!("read audit csv {}", path.display()))?;
    Ok(AuditIndex::from_rows(&rows))
}

/// Loads the audit table, falling back to an empty index when the file is
/// missing or unreadable. Every leg then enriches to `null`.
pub fn load_audit_index(path: &Path) -> AuditIndex {
    match load_audit_csv_path(path) {
        Ok(index) => {
            debug!(players = index.len(), path = %path.display(), "audit index loaded");
            index
        }
        Err(err) => {
            warn!("audit source unavailable, hit rates will be null: {err:#}");
            AuditIndex::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(resolved: &str, board: &str, pts: &str) -> AuditRow {
        AuditRow {
            resolved_player: Some(resolved.to_string()),
            board_player: Some(board.to_string()),
            last5_pts: Some(pts.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn normalize_name_collapses() {
        assert_eq!(normalize_name("  Luguentz   DORT "), "luguentz dort");
        assert_eq!(alpha_key("jaren jackson jr."), "jarenjacksonjr");
    }

    #[test]
    fn first_row_wins() {
        let rows = vec![row("Luka Doncic", "", "30|31"), row("luka  doncic", "", "1")];
        let index = AuditIndex::from_rows(&rows);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("Luka Doncic").map(|r| r.points.clone()), Some(vec![30.0, 31.0]));
    }

    #[test]
    fn repeat_with_new_board_name_aliases_first_record() {
        let rows = vec![
            row("Jalen Williams", "Jalen Williams", "20|22|24|26|28"),
            row("Jalen Williams", "J. Williams", "1"),
        ];
        let index = AuditIndex::from_rows(&rows);
        assert_eq!(index.len(), 1);
        let expected = Some(vec![20.0, 22.0, 24.0, 26.0, 28.0]);
        assert_eq!(index.get("Jalen Williams").map(|r| r.points.clone()), expected);
        assert_eq!(index.get("J. Williams").map(|r| r.points.clone()), expected);
        assert_eq!(index.get("j williams").map(|r| r.points.clone()), expected);
    }

    #[test]
    fn board_name_falls_back_and_aliases() {
        let rows = vec![
            row("", "Nic Claxton", "10"),
            row("Nicolas Claxton", "Nic Claxton", "4|5"),
        ];
        let index = AuditIndex::from_rows(&rows);
        assert_eq!(index.get("nic claxton").map(|r| r.points.clone()), Some(vec![10.0]));
        assert_eq!(index.get("Nicolas Claxton").map(|r| r.points.clone()), Some(vec![4.0, 5.0]));
    }

    #[test]
    fn alpha_lookup_ignores_punctuation() {
        let rows = vec![row("Jaren Jackson Jr.", "", "20")];
        let index = AuditIndex::from_rows(&rows);
        assert!(index.get("Jaren Jackson Jr").is_some());
        assert!(index.get("Someone Else").is_none());
    }

    #[test]
    fn blank_names_are_not_indexed() {
        let rows = vec![row("  ", "", "1|2")];
        assert!(AuditIndex::from_rows(&rows).is_empty());
    }
}
