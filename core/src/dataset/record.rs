use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::prelude::{EnergyDeposit, SimError, SimResult};

const ENTRIES_PER_LINE: usize = 5; // x, y, z, deposited_energy, event_id

/// One row of the event-generator output: a deposit in mm and MeV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub deposited_energy: f64,
    pub event_id: u64,
}

/// All deposits of a generator run, keyed by event id.
#[derive(Debug, Clone, Default)]
pub struct DepositTable {
    records: Vec<DepositRecord>,
}

impl DepositTable {
    pub fn new(records: Vec<DepositRecord>) -> Self {
        Self { records }
    }

    /// Parse comma separated rows `x,y,z,deposited_energy,event_id`. The first
    /// line is a header and is skipped; blank lines are ignored.
    pub fn from_csv_str(contents: &str) -> SimResult<Self> {
        let mut records = Vec::new();
        for (number, line) in contents.lines().enumerate().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entries: Vec<&str> = line.split(',').map(str::trim).collect();
            if entries.len() != ENTRIES_PER_LINE {
                return Err(SimError::InvalidInput(format!(
                    "line {}: expected {} columns, found {}",
                    number + 1,
                    ENTRIES_PER_LINE,
                    entries.len()
                )));
            }
            let float = |idx: usize| -> SimResult<f64> {
                entries[idx].parse::<f64>().map_err(|err| {
                    SimError::InvalidInput(format!("line {}: {}: {err}", number + 1, entries[idx]))
                })
            };
            records.push(DepositRecord {
                x: float(0)?,
                y: float(1)?,
                z: float(2)?,
                deposited_energy: float(3)?,
                event_id: entries[4].parse::<u64>().map_err(|err| {
                    SimError::InvalidInput(format!("line {}: {}: {err}", number + 1, entries[4]))
                })?,
            });
        }
        Ok(Self { records })
    }

    /// Parse a JSON array of records.
    pub fn from_json_str(contents: &str) -> SimResult<Self> {
        let records: Vec<DepositRecord> = serde_json::from_str(contents)
            .map_err(|err| SimError::InvalidInput(format!("deposit table json: {err}")))?;
        Ok(Self { records })
    }

    /// Read a `.json` or `.csv` file, chosen by extension.
    pub fn read(path: &Path) -> SimResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&contents),
            Some("csv") => Self::from_csv_str(&contents),
            _ => Err(SimError::InvalidInput(format!(
                "unsupported deposit table format: {}",
                path.display()
            ))),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DepositRecord] {
        &self.records
    }

    /// Distinct event ids in ascending order.
    pub fn event_ids(&self) -> Vec<u64> {
        self.records
            .iter()
            .map(|r| r.event_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Primary deposits of one event with energies converted to electrons.
    pub fn select_event(
        &self,
        event_id: u64,
        ionisation_energy_mev: f64,
    ) -> SimResult<Vec<EnergyDeposit>> {
        let deposits: Vec<EnergyDeposit> = self
            .records
            .iter()
            .filter(|r| r.event_id == event_id)
            .map(|r| {
                EnergyDeposit::primary(r.x, r.y, r.z, r.deposited_energy / ionisation_energy_mev)
            })
            .collect();
        if deposits.is_empty() {
            return Err(SimError::DataNotFound { event_id });
        }
        Ok(deposits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ARGON_IONISATION_ENERGY_MEV;

    const TABLE: &str = "x,y,z,deposited_energy,event_id\n\
                         1.0,2.0,3.0,0.0236,0\n\
                         4.0,5.0,6.0,0.00236,1\n\
                         \n\
                         7.0,8.0,9.0,0.0472,0\n";

    #[test]
    fn csv_rows_are_grouped_by_event() {
        let table = DepositTable::from_csv_str(TABLE).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.event_ids(), vec![0, 1]);
        let deposits = table.select_event(0, ARGON_IONISATION_ENERGY_MEV).unwrap();
        assert_eq!(deposits.len(), 2);
        assert!((deposits[0].electrons - 1000.0).abs() < 1e-6);
        assert!((deposits[1].electrons - 2000.0).abs() < 1e-6);
        assert_eq!(deposits[1].position(), [7.0, 8.0, 9.0]);
    }

    #[test]
    fn missing_event_is_data_not_found() {
        let table = DepositTable::from_csv_str(TABLE).unwrap();
        assert!(matches!(
            table.select_event(17, ARGON_IONISATION_ENERGY_MEV),
            Err(SimError::DataNotFound { event_id: 17 })
        ));
    }

    #[test]
    fn malformed_csv_reports_line() {
        let err = DepositTable::from_csv_str("header\n1.0,2.0,3.0\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        let err = DepositTable::from_csv_str("header\n1.0,2.0,3.0,abc,0\n").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn json_records_parse() {
        let json = r#"[{"x": 1.0, "y": 0.0, "z": 0.0, "deposited_energy": 0.5, "event_id": 3}]"#;
        let table = DepositTable::from_json_str(json).unwrap();
        assert_eq!(table.event_ids(), vec![3]);
        assert!(DepositTable::from_json_str("{").is_err());
    }
}
