use std::cmp::Ordering;

use serde_json::Value;

use crate::enrich::EnrichedSlip;

pub const SCORE_FIELDS: [&str; 5] = ["ev", "expected_value", "edge", "hit_prob", "p_hit"];

pub struct SourceSlips<'a> {
    pub label: &'a str,
    pub slips: &'a [EnrichedSlip],
}

pub fn slip_score(slip: &EnrichedSlip) -> Option<f64> {
    SCORE_FIELDS.iter().find_map(|key| {
        let v = slip.fields.get(*key)?;
        let n = match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|x| x.is_finite())
    })
}

/// Merges every source into one best-first list capped at `top_n`. Each slip
/// is tagged with the source it came from. Unscored slips sort last and ties
/// keep their input order.
pub fn combine_best_first(sources: &[SourceSlips<'_>], top_n: usize) -> Vec<EnrichedSlip> {
    let mut combined: Vec<(Option<f64>, EnrichedSlip)> = Vec::new();
    for source in sources {
        for slip in source.slips {
            let mut tagged = slip.clone();
            tagged
                .fields
                .insert("source".to_string(), Value::from(source.label));
            combined.push((slip_score(slip), tagged));
        }
    }
    combined.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    combined.truncate(top_n);
    combined.into_iter().map(|(_, slip)| slip).collect()
}
