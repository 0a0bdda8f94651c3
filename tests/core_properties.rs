use serde_json::{Value, json};

use atlas_publish::audit::{AuditIndex, AuditRow};
use atlas_publish::enrich::{EnrichOptions, EnrichedLeg, Row, enrich_row, enrich_rows, slip_passes};
use atlas_publish::hit_rate::count_hits;
use atlas_publish::leg_text::{Direction, ParsedLeg, parse_leg_text};
use atlas_publish::series::parse_series;
use atlas_publish::stat_eval::derived_series;

fn audit_row(name: &str, pts: &str, reb: &str) -> AuditRow {
    AuditRow {
        resolved_player: Some(name.to_string()),
        board_player: None,
        last5_pts: Some(pts.to_string()),
        last5_reb: Some(reb.to_string()),
        last5_ast: None,
        last5_fg3m: None,
    }
}

fn row(value: Value) -> Row {
    value.as_object().cloned().expect("test row should be an object")
}

#[test]
fn series_parse_skips_bad_tokens() {
    assert_eq!(parse_series("10|12|x|8"), vec![10.0, 12.0, 8.0]);
    assert!(parse_series("").is_empty());
    assert!(parse_series(" \t ").is_empty());
}

#[test]
fn audit_first_write_wins() {
    let rows = vec![
        audit_row("Luguentz Dort", "8|12", "2|5|3|1|4"),
        audit_row("LUGUENTZ  DORT", "1|1|1|1|1", "0"),
    ];
    let index = AuditIndex::from_rows(&rows);
    let record = index.get("luguentz dort").expect("dort should be indexed");
    assert_eq!(record.points, vec![8.0, 12.0]);
    assert_eq!(record.rebounds, vec![2.0, 5.0, 3.0, 1.0, 4.0]);
}

#[test]
fn leg_grammar_full_shape() {
    let leg = parse_leg_text("Jaren Jackson OVER PRA 22.5 (GOBLIN) [id:9805821]");
    assert_eq!(
        leg,
        ParsedLeg {
            id: Some(9805821),
            player: Some("Jaren Jackson".to_string()),
            direction: Some(Direction::Over),
            stat: Some("PRA".to_string()),
            line: Some(22.5),
            tier: Some("GOBLIN".to_string()),
            raw_text: "Jaren Jackson OVER PRA 22.5 (GOBLIN) [id:9805821]".to_string(),
        }
    );
}

#[test]
fn combination_truncates() {
    let rows = vec![audit_row("P", "10|12|9", "5|6")];
    let index = AuditIndex::from_rows(&rows);
    assert_eq!(derived_series(index.get("P"), "PR"), vec![15.0, 18.0]);
}

#[test]
fn push_is_not_a_hit() {
    let s = [20.0, 25.0, 18.0, 30.0, 22.0];
    assert_eq!(count_hits(&s, &Direction::Over, 22.0), Some(2));
}

#[test]
fn no_data_versus_zero_hits() {
    assert_eq!(count_hits(&[], &Direction::Under, 5.0), None);
    assert_eq!(count_hits(&[9.0, 8.0], &Direction::Under, 5.0), Some(0));
}

#[test]
fn slip_filter_rule() {
    let leg = |hits| EnrichedLeg {
        leg: ParsedLeg::unparsed("leg"),
        last5_hits: hits,
    };
    assert!(!slip_passes(&[leg(Some(3)), leg(Some(0)), leg(None)]));
    assert!(slip_passes(&[leg(None), leg(None)]));
}

#[test]
fn enrichment_is_idempotent() {
    let rows = vec![audit_row("Luguentz Dort", "8|12|6|15|9", "2|5|3|1|4")];
    let index = AuditIndex::from_rows(&rows);
    let slips = vec![row(json!({
        "leg_1": "Luguentz Dort OVER REB 2.5 (GOBLIN) [id:9800573]",
        "leg_2": "Luguentz Dort UNDER PTS 9 [id:9800574]",
        "leg_3": "Nobody OVER AST 1.5",
    }))];
    let opts = EnrichOptions::default();
    let first = enrich_rows(&slips, &index, opts);
    let second = enrich_rows(&slips, &index, opts);
    let render = |r: &atlas_publish::enrich::EnrichReport| {
        serde_json::to_string(&r.slips[0].legs_detail()).expect("legs_detail serializes")
    };
    assert_eq!(render(&first), render(&second));
}

#[test]
fn dort_rebounds_scenario() {
    let rows = vec![audit_row("Luguentz Dort", "", "2|5|3|1|4")];
    let index = AuditIndex::from_rows(&rows);
    let slip = enrich_row(
        &row(json!({"legs": "Luguentz Dort OVER REB 2.5 (GOBLIN) [id:9800573]"})),
        &index,
    );
    assert_eq!(slip.legs.len(), 1);
    assert_eq!(slip.legs[0].last5_hits, Some(3));

    let detail = slip.legs_detail();
    assert_eq!(
        detail[0],
        json!({
            "id": 9800573,
            "player": "Luguentz Dort",
            "stat": "REB",
            "direction": "OVER",
            "line": 2.5,
            "tier": "GOBLIN",
            "last5_hits": 3,
            "leg_text": "Luguentz Dort OVER REB 2.5 (GOBLIN) [id:9800573]",
        })
    );
}

#[test]
fn parallel_and_sequential_agree_on_order() {
    let rows = vec![audit_row("A Player", "10|20|30", "1|2|3")];
    let index = AuditIndex::from_rows(&rows);
    let slips: Vec<Row> = (0..200)
        .map(|i| {
            row(json!({
                "n": i,
                "leg_1": format!("A Player OVER PTS {}.5", i % 35),
            }))
        })
        .collect();
    let par = enrich_rows(
        &slips,
        &index,
        EnrichOptions {
            drop_cold_legs: true,
            parallel: true,
        },
    );
    let seq = enrich_rows(
        &slips,
        &index,
        EnrichOptions {
            drop_cold_legs: true,
            parallel: false,
        },
    );
    let ids = |r: &atlas_publish::enrich::EnrichReport| {
        r.slips
            .iter()
            .filter_map(|s| s.fields["n"].as_i64())
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&par), ids(&seq));
    assert_eq!(par.dropped, seq.dropped);
    // lines 30.5..34.5 clear every game: five per cycle of 35
    assert_eq!(par.dropped, 25);
}

#[test]
fn unknown_direction_yields_null() {
    let rows = vec![audit_row("A Player", "10|20|30", "")];
    let index = AuditIndex::from_rows(&rows);
    let slip = enrich_row(
        &row(json!({
            "legs_detail": [{"player": "A Player", "stat": "PTS", "direction": "sideways", "line": 5}]
        })),
        &index,
    );
    assert_eq!(slip.legs[0].leg.direction, Some(Direction::Other("SIDEWAYS".into())));
    assert_eq!(slip.legs[0].last5_hits, None);
    assert!(slip.keep);
}
