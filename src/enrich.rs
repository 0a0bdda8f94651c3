use rayon::prelude::*;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::audit::AuditIndex;
use crate::hit_rate::count_hits;
use crate::leg_text::{Direction, ParsedLeg, parse_leg_text};
use crate::stat_eval::{canonical_stat, derived_series};

/// A recommendation row: whatever fields the source carried, untouched.
pub type Row = Map<String, Value>;

pub const LEG_COLUMNS: [&str; 5] = ["leg_1", "leg_2", "leg_3", "leg_4", "leg_5"];
pub const LEGS_DETAIL: &str = "legs_detail";

type LegExtractor = fn(&Row) -> Option<Vec<ParsedLeg>>;

/// Tried in order; the first strategy that yields at least one leg wins.
const EXTRACTORS: [(&str, LegExtractor); 4] = [
    ("legs_detail", legs_from_detail),
    ("leg_columns", legs_from_columns),
    ("legs", legs_from_blob_legs),
    ("slip_key", legs_from_blob_slip_key),
];

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedLeg {
    pub leg: ParsedLeg,
    pub last5_hits: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
struct LegDetail<'a> {
    id: Option<u64>,
    player: Option<&'a str>,
    stat: Option<&'a str>,
    direction: Option<&'a Direction>,
    line: Option<f64>,
    tier: Option<&'a str>,
    last5_hits: Option<u32>,
    leg_text: &'a str,
}

impl EnrichedLeg {
    pub fn to_value(&self) -> Value {
        let detail = LegDetail {
            id: self.leg.id,
            player: self.leg.player.as_deref(),
            stat: self.leg.stat.as_deref(),
            direction: self.leg.direction.as_ref(),
            line: self.leg.line,
            tier: self.leg.tier.as_deref(),
            last5_hits: self.last5_hits,
            leg_text: &self.leg.raw_text,
        };
        serde_json::to_value(detail).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct EnrichedSlip {
    pub fields: Row,
    pub legs: Vec<EnrichedLeg>,
    /// Which extraction strategy produced the legs, if any did.
    pub strategy: Option<&'static str>,
    pub keep: bool,
}

impl EnrichedSlip {
    pub fn legs_detail(&self) -> Value {
        Value::Array(self.legs.iter().map(EnrichedLeg::to_value).collect())
    }

    pub fn to_value(&self) -> Value {
        let mut out = self.fields.clone();
        out.insert(LEGS_DETAIL.to_string(), self.legs_detail());
        Value::Object(out)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    /// Drop slips holding a leg that missed all of its recent games.
    pub drop_cold_legs: bool,
    pub parallel: bool,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            drop_cold_legs: false,
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EnrichReport {
    pub slips: Vec<EnrichedSlip>,
    pub dropped: usize,
    pub legs_total: usize,
    pub legs_unparsed: usize,
    pub legs_with_hits: usize,
}

pub fn extract_legs(row: &Row) -> (Option<&'static str>, Vec<ParsedLeg>) {
    for (name, extractor) in EXTRACTORS {
        if let Some(legs) = extractor(row)
            && !legs.is_empty()
        {
            return (Some(name), legs);
        }
    }
    (None, Vec::new())
}

pub fn leg_hits(leg: &ParsedLeg, index: &AuditIndex) -> Option<u32> {
    let player = leg.player.as_deref()?;
    let stat = leg.stat.as_deref()?;
    let direction = leg.direction.as_ref()?;
    let line = leg.line?;
    let record = index.get(player)?;
    count_hits(&derived_series(Some(record), stat), direction, line)
}

pub fn enrich_leg(leg: ParsedLeg, index: &AuditIndex) -> EnrichedLeg {
    let last5_hits = leg_hits(&leg, index);
    EnrichedLeg { leg, last5_hits }
}

/// A slip survives unless some leg has a known hit count of exactly zero.
/// Legs without data never count against it.
pub fn slip_passes(legs: &[EnrichedLeg]) -> bool {
    !legs.iter().any(|l| l.last5_hits == Some(0))
}

pub fn enrich_row(row: &Row, index: &AuditIndex) -> EnrichedSlip {
    let (strategy, legs) = extract_legs(row);
    let legs: Vec<EnrichedLeg> = legs.into_iter().map(|leg| enrich_leg(leg, index)).collect();
    let keep = slip_passes(&legs);
    EnrichedSlip {
        fields: row.clone(),
        legs,
        strategy,
        keep,
    }
}

/// Enriches every row, keeping input order whether or not the work runs in
/// parallel. With `drop_cold_legs` set, rows failing [`slip_passes`] are removed.
pub fn enrich_rows(rows: &[Row], index: &AuditIndex, opts: EnrichOptions) -> EnrichReport {
    let enriched: Vec<EnrichedSlip> = if opts.parallel {
        rows.par_iter().map(|row| enrich_row(row, index)).collect()
    } else {
        rows.iter().map(|row| enrich_row(row, index)).collect()
    };

    let mut report = EnrichReport::default();
    for slip in enriched {
        report.legs_total += slip.legs.len();
        report.legs_unparsed += slip.legs.iter().filter(|l| !l.leg.is_parsed()).count();
        report.legs_with_hits += slip.legs.iter().filter(|l| l.last5_hits.is_some()).count();
        if opts.drop_cold_legs && !slip.keep {
            report.dropped += 1;
            continue;
        }
        report.slips.push(slip);
    }
    report
}

fn legs_from_detail(row: &Row) -> Option<Vec<ParsedLeg>> {
    let raw = row.get(LEGS_DETAIL)?;
    // CSV exports carry the array as an embedded JSON string.
    let decoded;
    let items = match raw {
        Value::Array(items) => items,
        Value::String(s) => {
            decoded = serde_json::from_str::<Value>(s).ok()?;
            decoded.as_array()?
        }
        _ => return None,
    };
    Some(items.iter().filter_map(structured_leg).collect())
}

fn structured_leg(item: &Value) -> Option<ParsedLeg> {
    let obj = item.as_object()?;
    let text = ["leg_text", "rawText", "raw_text"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let mut leg = text.map(parse_leg_text).unwrap_or_default();
    if let Some(player) = str_field(obj, "player") {
        leg.player = Some(player.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    if let Some(stat) = str_field(obj, "stat") {
        leg.stat = Some(canonical_stat(stat));
    }
    if let Some(direction) = str_field(obj, "direction").and_then(Direction::parse) {
        leg.direction = Some(direction);
    }
    if obj.contains_key("line") {
        leg.line = obj.get("line").and_then(number_field);
    }
    if let Some(id) = obj.get("id").and_then(id_field) {
        leg.id = Some(id);
    }
    if let Some(tier) = str_field(obj, "tier") {
        leg.tier = Some(tier.to_ascii_uppercase());
    }
    if leg.player.is_none() && leg.raw_text.is_empty() {
        return None;
    }
    Some(leg)
}

fn legs_from_columns(row: &Row) -> Option<Vec<ParsedLeg>> {
    let legs: Vec<ParsedLeg> = LEG_COLUMNS
        .iter()
        .filter_map(|col| row.get(*col).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_leg_text)
        .collect();
    Some(legs)
}

fn legs_from_blob_legs(row: &Row) -> Option<Vec<ParsedLeg>> {
    legs_from_blob(row, "legs")
}

fn legs_from_blob_slip_key(row: &Row) -> Option<Vec<ParsedLeg>> {
    legs_from_blob(row, "slip_key")
}

fn legs_from_blob(row: &Row, column: &str) -> Option<Vec<ParsedLeg>> {
    let blob = row.get(column)?.as_str()?;
    Some(
        blob.split('|')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_leg_text)
            .collect(),
    )
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn number_field(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|x| x.is_finite())
}

fn id_field(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
