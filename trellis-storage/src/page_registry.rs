//! Persisted registry of extension-contributed page definitions.

use crate::error::{RegistryError, StorageError, StorageResult};
use crate::row_store::SqliteStore;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use tracing::{debug, info};
use trellis_types::{PageDefinition, PageId, StoredPage};

/// Result of a successful `register_page` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(PageId),
    Updated(PageId),
}

impl UpsertOutcome {
    pub fn id(&self) -> PageId {
        match self {
            Self::Inserted(id) | Self::Updated(id) => *id,
        }
    }
}

/// Owns the `pages` table.
pub struct PageRegistry {
    store: SqliteStore,
}

impl PageRegistry {
    /// Wraps `store`, creating or migrating the `pages` table.
    pub fn open(store: SqliteStore) -> StorageResult<Self> {
        {
            let conn = store.lock()?;
            migrate(&conn)?;
        }
        Ok(Self { store })
    }

    /// The underlying store, for handing out as a persistence handle.
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Inserts `def`, or updates the row already holding its `path` or `name`.
    ///
    /// The lookup and the write share one `BEGIN IMMEDIATE` transaction, so
    /// concurrent registrations of the same key cannot both insert. When
    /// `path` and `name` match two different rows the `path` row is chosen
    /// and the uniqueness constraint on `name` rejects the write.
    pub fn register_page(&self, def: &PageDefinition) -> Result<UpsertOutcome, RegistryError> {
        def.validate()?;
        let outcome = self.upsert(def)?;
        match outcome {
            UpsertOutcome::Inserted(id) => {
                info!(page_id = %id, name = %def.name, path = %def.path, "Page registered")
            }
            UpsertOutcome::Updated(id) => {
                info!(page_id = %id, name = %def.name, path = %def.path, "Page updated")
            }
        }
        Ok(outcome)
    }

    fn upsert(&self, def: &PageDefinition) -> StorageResult<UpsertOutcome> {
        let mut conn = self.store.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM pages WHERE path = ?1 OR name = ?2
                 ORDER BY (path = ?1) DESC, id LIMIT 1",
                params![def.path, def.name],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match existing {
            Some(id) => {
                tx.execute(
                    "UPDATE pages SET path = ?1, name = ?2, component_template = ?3,
                        component_script = ?4, requires_auth = ?5, requires_admin = ?6,
                        overrides_route_name = ?7
                     WHERE id = ?8",
                    params![
                        def.path,
                        def.name,
                        def.component_template,
                        def.component_script,
                        def.requires_auth,
                        def.requires_admin,
                        def.overrides_route_name,
                        id,
                    ],
                )?;
                UpsertOutcome::Updated(PageId::new(id))
            }
            None => {
                tx.execute(
                    "INSERT INTO pages (path, name, component_template, component_script,
                        requires_auth, requires_admin, overrides_route_name)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![
                        def.path,
                        def.name,
                        def.component_template,
                        def.component_script,
                        def.requires_auth,
                        def.requires_admin,
                        def.overrides_route_name,
                    ],
                )?;
                UpsertOutcome::Inserted(PageId::new(tx.last_insert_rowid()))
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    /// Point-in-time snapshot of every persisted page, ordered by id.
    pub fn list_pages(&self) -> StorageResult<Vec<StoredPage>> {
        let conn = self.store.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, path, name, component_template, component_script,
                    requires_auth, requires_admin, overrides_route_name
             FROM pages ORDER BY id",
        )?;
        let pages = stmt
            .query_map([], |row| {
                Ok(StoredPage {
                    id: PageId::new(row.get(0)?),
                    definition: PageDefinition {
                        path: row.get(1)?,
                        name: row.get(2)?,
                        component_template: row.get(3)?,
                        component_script: row.get(4)?,
                        requires_auth: row.get(5)?,
                        requires_admin: row.get(6)?,
                        overrides_route_name: row.get(7)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    /// Number of persisted pages.
    pub fn page_count(&self) -> StorageResult<usize> {
        let conn = self.store.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn migrate(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            path TEXT UNIQUE NOT NULL,
            name TEXT UNIQUE NOT NULL,
            component_template TEXT NOT NULL,
            component_script TEXT NOT NULL,
            requires_auth INTEGER NOT NULL DEFAULT 0,
            requires_admin INTEGER NOT NULL DEFAULT 0,
            overrides_route_name TEXT DEFAULT NULL
        );
        ",
    )?;

    let columns: Vec<String> = conn
        .prepare("PRAGMA table_info(pages)")?
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<_, _>>()?;

    if !columns.iter().any(|c| c == "overrides_route_name") {
        conn.execute_batch("ALTER TABLE pages ADD COLUMN overrides_route_name TEXT DEFAULT NULL")?;
        info!("Added overrides_route_name column to pages table");
    }

    // Tables created before `name` was unique need the index added separately.
    conn.execute_batch("CREATE UNIQUE INDEX IF NOT EXISTS idx_pages_name ON pages(name)")
        .map_err(|e| StorageError::Migration(format!("cannot enforce unique page names: {e}")))?;

    debug!("pages schema ready");
    Ok(())
}
