//! Deterministic merge of per-batch extraction records

use chrono::NaiveDate;
use ragner_core::ExtractionRecord;
use std::collections::BTreeSet;

/// Union all records into one canonical result.
///
/// Order-independent: each field is a set union over the inputs, so input
/// order never changes the outcome. Organisations are normalized after the
/// union, dates filtered for validity; the other four fields are
/// union + dedupe only. An empty input still yields all six lists.
pub fn merge_records(records: &[ExtractionRecord]) -> ExtractionRecord {
    let persons = union(records, |r| &r.persons);
    let organisations = union(records, |r| &r.organisations);
    let dates = union(records, |r| &r.dates);
    let mineral_deposits = union(records, |r| &r.mineral_deposits);
    let reservoirs = union(records, |r| &r.reservoirs);
    let npt_codes = union(records, |r| &r.npt_codes);

    ExtractionRecord {
        persons: Some(persons),
        organisations: Some(normalize_organisations(organisations)),
        dates: Some(filter_dates(dates)),
        mineral_deposits: Some(mineral_deposits),
        reservoirs: Some(reservoirs),
        npt_codes: Some(npt_codes),
    }
}

fn union<F>(records: &[ExtractionRecord], field: F) -> Vec<String>
where
    F: Fn(&ExtractionRecord) -> &Option<Vec<String>>,
{
    let mut merged = BTreeSet::new();
    for record in records {
        if let Some(entities) = field(record) {
            merged.extend(entities.iter().cloned());
        }
    }
    merged.into_iter().collect()
}

/// The model wraps organisation names in angle brackets as a delimiter;
/// convert that convention to quotes, one character for one character.
fn normalize_organisations(mut entities: Vec<String>) -> Vec<String> {
    for entity in &mut entities {
        *entity = entity
            .chars()
            .map(|c| if c == '<' || c == '>' { '"' } else { c })
            .collect();
    }
    entities
}

/// Keep only strings that parse strictly as dd.MM.yyyy; anything else is
/// expected model noise and dropped silently.
fn filter_dates(entities: Vec<String>) -> Vec<String> {
    entities.into_iter().filter(|e| is_valid_date(e)).collect()
}

fn is_valid_date(entity: &str) -> bool {
    // chrono's %d accepts single digits, the original pattern does not
    entity.len() == 10 && NaiveDate::parse_from_str(entity, "%d.%m.%Y").is_ok()
}
