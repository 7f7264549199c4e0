//! Extraction records - the structured output of one generation call

use crate::Result;
use serde::{Deserialize, Serialize};

/// Wire names of the six entity fields
pub const LABEL_PERSON: &str = "PERSON";
pub const LABEL_ORGANISATION: &str = "ORGANISATION";
pub const LABEL_DATE: &str = "DATE";
pub const LABEL_MINERAL_DEPOSIT: &str = "MINERALDEPOSIT";
pub const LABEL_RESERVOIR: &str = "RESERVOIR";
pub const LABEL_NPT: &str = "NPT";

/// Entity lists extracted from one batch of document text.
///
/// The field set is fixed: the model is asked for exactly these six labels.
/// Absent fields deserialize as `None` and contribute nothing to a merge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    #[serde(rename = "PERSON", default)]
    pub persons: Option<Vec<String>>,

    #[serde(rename = "ORGANISATION", default)]
    pub organisations: Option<Vec<String>>,

    #[serde(rename = "DATE", default)]
    pub dates: Option<Vec<String>>,

    #[serde(rename = "MINERALDEPOSIT", default)]
    pub mineral_deposits: Option<Vec<String>>,

    #[serde(rename = "RESERVOIR", default)]
    pub reservoirs: Option<Vec<String>>,

    #[serde(rename = "NPT", default)]
    pub npt_codes: Option<Vec<String>>,
}

/// The six entity kinds the pipeline extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Person,
    Organisation,
    Date,
    MineralDeposit,
    Reservoir,
    Npt,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Person,
        EntityKind::Organisation,
        EntityKind::Date,
        EntityKind::MineralDeposit,
        EntityKind::Reservoir,
        EntityKind::Npt,
    ];

    /// Wire name of this kind's field
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Person => LABEL_PERSON,
            EntityKind::Organisation => LABEL_ORGANISATION,
            EntityKind::Date => LABEL_DATE,
            EntityKind::MineralDeposit => LABEL_MINERAL_DEPOSIT,
            EntityKind::Reservoir => LABEL_RESERVOIR,
            EntityKind::Npt => LABEL_NPT,
        }
    }

    /// A record holding `entities` under this kind's field only
    pub fn record_from(self, entities: Vec<String>) -> ExtractionRecord {
        let mut record = ExtractionRecord::default();
        match self {
            EntityKind::Person => record.persons = Some(entities),
            EntityKind::Organisation => record.organisations = Some(entities),
            EntityKind::Date => record.dates = Some(entities),
            EntityKind::MineralDeposit => record.mineral_deposits = Some(entities),
            EntityKind::Reservoir => record.reservoirs = Some(entities),
            EntityKind::Npt => record.npt_codes = Some(entities),
        }
        record
    }
}

impl ExtractionRecord {
    /// A record with all six lists present and empty.
    ///
    /// Merging always starts from this shape so the serialized result
    /// carries every field, never a null.
    pub fn empty() -> Self {
        Self {
            persons: Some(Vec::new()),
            organisations: Some(Vec::new()),
            dates: Some(Vec::new()),
            mineral_deposits: Some(Vec::new()),
            reservoirs: Some(Vec::new()),
            npt_codes: Some(Vec::new()),
        }
    }

    /// True when no field holds any entity
    pub fn is_blank(&self) -> bool {
        [
            &self.persons,
            &self.organisations,
            &self.dates,
            &self.mineral_deposits,
            &self.reservoirs,
            &self.npt_codes,
        ]
        .iter()
        .all(|field| field.as_ref().map_or(true, |list| list.is_empty()))
    }

    /// Serialize for the answer payload
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
