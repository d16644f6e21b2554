//! Metadata Store
//!
//! Durable catalog of tables and table files.
//!
//! ## Responsibilities
//! - Register tables and allocate identity/location for new table files
//! - Persist file state transitions written at flush time
//! - Answer "which files are in state X" for downstream indexing
//! - Rediscover the catalog on restart

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{AtlasError, Result};
use crate::format::{read_framed, write_framed};

use super::schema::{now_millis, FileType, TableFileSchema, TableSchema};

/// Durable record of table and table-file schemas
pub trait MetadataStore: Send + Sync {
    /// Register a new logical table
    fn create_table(&self, schema: TableSchema) -> Result<TableSchema>;

    /// Look up a table by id
    fn describe_table(&self, table_id: &str) -> Result<TableSchema>;

    /// Allocate a new file row for `request.table_id`.
    ///
    /// The returned schema carries the assigned `id`, `file_id` and
    /// `directory`, plus the table-level fields copied from the table row.
    fn create_table_file(&self, request: TableFileSchema) -> Result<TableFileSchema>;

    /// Persist the current state of an existing file row
    fn update_table_file(&self, file: &TableFileSchema) -> Result<()>;

    /// Look up a file row by file id
    fn get_table_file(&self, file_id: &str) -> Result<TableFileSchema>;

    /// All files of a table whose type is one of `file_types`, oldest first
    fn files_by_type(&self, table_id: &str, file_types: &[FileType]) -> Result<Vec<TableFileSchema>>;
}

/// Everything the store persists, rewritten as one unit
#[derive(Debug, Default, Serialize, Deserialize)]
struct Catalog {
    tables: BTreeMap<String, TableSchema>,
    files: BTreeMap<String, TableFileSchema>,
}

/// File-backed [`MetadataStore`]
///
/// ## Concurrency:
/// - `catalog`: Protected by RwLock (lookups share, mutations are exclusive
///   and hold the lock across the rewrite of `meta.bin`)
/// - `next_file_id`: Atomic counter (lock-free)
pub struct FileMetaStore {
    /// Root directory; holds `meta.bin` and the `tables/` tree
    root: PathBuf,

    catalog: RwLock<Catalog>,

    /// Next id handed to a new table file
    next_file_id: AtomicU64,
}

impl FileMetaStore {
    const CATALOG_FILENAME: &'static str = "meta.bin";
    const TABLES_DIR: &'static str = "tables";
    const MAGIC: &'static [u8; 4] = b"AVMT";

    /// Open or create a store rooted at `path`
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Load the catalog if one was written before
    /// 3. Continue file ids at max + 1
    pub fn open(path: &Path) -> Result<Self> {
        fs::create_dir_all(path)?;

        let catalog_path = path.join(Self::CATALOG_FILENAME);
        let catalog: Catalog = if catalog_path.exists() {
            read_framed(&catalog_path, Self::MAGIC)?
        } else {
            Catalog::default()
        };

        let next_id = catalog.files.values().map(|f| f.id).max().map(|id| id + 1).unwrap_or(1);

        tracing::debug!(
            root = %path.display(),
            tables = catalog.tables.len(),
            files = catalog.files.len(),
            next_id,
            "metadata store opened"
        );

        Ok(Self {
            root: path.to_path_buf(),
            catalog: RwLock::new(catalog),
            next_file_id: AtomicU64::new(next_id),
        })
    }

    /// Open the store rooted at `config.data_dir`
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(&config.data_dir)
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of registered table files (for testing/debugging)
    pub fn file_count(&self) -> usize {
        self.catalog.read().files.len()
    }

    /// Get the next file id (for testing/debugging)
    pub fn next_file_id(&self) -> u64 {
        self.next_file_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn persist(&self, catalog: &Catalog) -> Result<()> {
        write_framed(&self.root.join(Self::CATALOG_FILENAME), Self::MAGIC, catalog)?;
        Ok(())
    }

    /// "{root}/tables/{table_id}/{id:06}"
    fn file_directory(&self, table_id: &str, file_id: &str) -> PathBuf {
        self.root.join(Self::TABLES_DIR).join(table_id).join(file_id)
    }
}

impl MetadataStore for FileMetaStore {
    fn create_table(&self, mut schema: TableSchema) -> Result<TableSchema> {
        if schema.table_id.is_empty() {
            return Err(AtlasError::Metadata("table id must not be empty".to_string()));
        }

        let mut catalog = self.catalog.write();
        if catalog.tables.contains_key(&schema.table_id) {
            return Err(AtlasError::Metadata(format!(
                "table {} already exists",
                schema.table_id
            )));
        }

        schema.created_on = now_millis();
        catalog.tables.insert(schema.table_id.clone(), schema.clone());
        if let Err(e) = self.persist(&catalog) {
            catalog.tables.remove(&schema.table_id);
            return Err(e);
        }

        Ok(schema)
    }

    fn describe_table(&self, table_id: &str) -> Result<TableSchema> {
        self.catalog
            .read()
            .tables
            .get(table_id)
            .cloned()
            .ok_or_else(|| AtlasError::TableNotFound(table_id.to_string()))
    }

    fn create_table_file(&self, mut request: TableFileSchema) -> Result<TableFileSchema> {
        let mut catalog = self.catalog.write();

        let table = catalog
            .tables
            .get(&request.table_id)
            .cloned()
            .ok_or_else(|| AtlasError::TableNotFound(request.table_id.clone()))?;

        let id = self.next_file_id.fetch_add(1, Ordering::SeqCst);
        let now = now_millis();

        request.id = id;
        request.file_id = format!("{:06}", id);
        request.file_type = FileType::Raw;
        request.file_size = 0;
        request.row_count = 0;
        request.dimension = table.dimension;
        request.engine_type = table.engine_type;
        request.metric_type = table.metric_type;
        request.index_file_size = table.index_file_size;
        request.nlist = table.nlist;
        request.directory = self.file_directory(&table.table_id, &request.file_id);
        request.created_on = now;
        request.updated_time = now;

        catalog.files.insert(request.file_id.clone(), request.clone());
        if let Err(e) = self.persist(&catalog) {
            catalog.files.remove(&request.file_id);
            return Err(e);
        }

        Ok(request)
    }

    fn update_table_file(&self, file: &TableFileSchema) -> Result<()> {
        let mut catalog = self.catalog.write();

        let previous = catalog
            .files
            .get(&file.file_id)
            .cloned()
            .ok_or_else(|| AtlasError::FileNotFound(file.file_id.clone()))?;

        let mut updated = file.clone();
        updated.updated_time = now_millis();
        catalog.files.insert(file.file_id.clone(), updated);

        if let Err(e) = self.persist(&catalog) {
            catalog.files.insert(file.file_id.clone(), previous);
            return Err(e);
        }

        Ok(())
    }

    fn get_table_file(&self, file_id: &str) -> Result<TableFileSchema> {
        self.catalog
            .read()
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| AtlasError::FileNotFound(file_id.to_string()))
    }

    fn files_by_type(&self, table_id: &str, file_types: &[FileType]) -> Result<Vec<TableFileSchema>> {
        let catalog = self.catalog.read();
        if !catalog.tables.contains_key(table_id) {
            return Err(AtlasError::TableNotFound(table_id.to_string()));
        }

        let mut files: Vec<TableFileSchema> = catalog
            .files
            .values()
            .filter(|f| f.table_id == table_id && file_types.contains(&f.file_type))
            .cloned()
            .collect();
        files.sort_by_key(|f| f.id);
        Ok(files)
    }
}
