//! Startup integrity checks for the governance database.
//!
//! Every stored value must carry a version header; a value that doesn't is
//! reported rather than aborting the scan, so the operator sees all damage
//! at once.

use std::path::Path;

use agora_store::{Record, Table};

use crate::environment::LmdbEnvironment;
use crate::LmdbError;

/// What [`check_integrity`] found.
#[derive(Debug, Default)]
pub struct IntegrityReport {
    pub tables_checked: u32,
    pub total_records: u64,
    pub errors: Vec<String>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Walk every table and confirm each value decodes as a versioned record.
pub fn check_integrity(env: &LmdbEnvironment) -> Result<IntegrityReport, LmdbError> {
    let mut report = IntegrityReport::default();
    let rtxn = env.env.read_txn()?;

    for table in Table::ALL {
        let db = env.db(table)?;
        report.tables_checked += 1;
        let iter = match db.iter(&rtxn) {
            Ok(iter) => iter,
            Err(e) => {
                report.errors.push(format!("failed to read '{table}': {e}"));
                continue;
            }
        };
        for entry in iter {
            match entry {
                Ok((key, value)) => {
                    report.total_records += 1;
                    if Record::from_bytes(value).is_none() {
                        report.errors.push(format!(
                            "undecodable record in '{table}' at key {}",
                            String::from_utf8_lossy(key)
                        ));
                    }
                }
                Err(e) => report.errors.push(format!("cursor error in '{table}': {e}")),
            }
        }
    }

    Ok(report)
}

/// Check that an existing data directory holds an LMDB file before opening.
///
/// A missing directory is a fresh start and passes.
pub fn check_data_dir(path: &Path) -> Result<(), String> {
    if !path.exists() {
        return Ok(());
    }
    if !path.join("data.mdb").exists() {
        return Err(format!(
            "data directory exists but data.mdb is missing at {}",
            path.display()
        ));
    }
    Ok(())
}
