//! LMDB environment setup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use agora_store::Table;

use crate::LmdbError;

/// Name of the database holding sequence counters.
pub(crate) const META_DB: &str = "meta";

/// Default map size: 1 GiB.
pub const DEFAULT_MAP_SIZE: usize = 1024 * 1024 * 1024;

/// An open LMDB environment with one handle per governance table.
pub struct LmdbEnvironment {
    pub(crate) env: Env,
    pub(crate) tables: HashMap<Table, Database<Bytes, Bytes>>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
    path: PathBuf,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given path, creating one
    /// named database per governance table.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment is opened once per process and path; callers
        // must not open the same directory twice concurrently, which is the
        // invariant heed requires for memory-mapped access.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(Table::ALL.len() as u32 + 1)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let mut tables = HashMap::with_capacity(Table::ALL.len());
        for table in Table::ALL {
            let db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(table.name()))?;
            tables.insert(table, db);
        }
        let meta_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(META_DB))?;
        wtxn.commit()?;

        info!(path = %path.display(), map_size, "opened LMDB environment");

        Ok(Self {
            env,
            tables,
            meta_db,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn db(&self, table: Table) -> Result<Database<Bytes, Bytes>, LmdbError> {
        self.tables
            .get(&table)
            .copied()
            .ok_or_else(|| LmdbError::NotFound(format!("database '{}'", table.name())))
    }
}
