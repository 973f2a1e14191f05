//! SQLite-backed tree store.
//!
//! One `nodes` table; a folder's children are the rows pointing at it,
//! ordered by `position`. The single row without a parent is the root.

use super::BookmarkTree;
use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use linkman_types::{NativeNode, NodeArena, NodeId};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent tree store backed by SQLite.
#[derive(Debug, Clone)]
pub struct SqliteBookmarkTree {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBookmarkTree {
    /// Opens (or creates) a tree store at the given path.
    pub fn open(path: &str) -> SyncResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open bookmark tree: {e}")))?;
        Self::with_connection(conn)
    }

    /// Opens an in-memory tree store (for testing).
    pub fn open_in_memory() -> SyncResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            SyncError::Storage(format!("failed to open in-memory bookmark tree: {e}"))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> SyncResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Storage("bookmark tree lock poisoned".to_string()))
    }

    fn init_schema(&self) -> SyncResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS nodes (
                id TEXT PRIMARY KEY,
                parent_id TEXT REFERENCES nodes(id),
                position INTEGER NOT NULL,
                title TEXT NOT NULL,
                url TEXT
            );

            CREATE INDEX IF NOT EXISTS nodes_parent ON nodes(parent_id, position);
            ",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init tree schema: {e}")))?;

        let has_root: Option<String> = conn
            .query_row("SELECT id FROM nodes WHERE parent_id IS NULL", [], |row| {
                row.get(0)
            })
            .optional()?;
        if has_root.is_none() {
            conn.execute(
                "INSERT INTO nodes (id, parent_id, position, title, url) VALUES (?1, NULL, 0, ?2, NULL)",
                params![NodeId::new().to_string(), "Bookmarks"],
            )?;
        }
        Ok(())
    }

    fn root_id_locked(conn: &Connection) -> SyncResult<NodeId> {
        let id: String =
            conn.query_row("SELECT id FROM nodes WHERE parent_id IS NULL", [], |row| {
                row.get(0)
            })?;
        parse_id(&id)
    }

    /// Returns the root folder id.
    pub fn root_id(&self) -> SyncResult<NodeId> {
        let conn = self.lock()?;
        Self::root_id_locked(&conn)
    }

    fn insert_locked(
        conn: &Connection,
        parent: NodeId,
        title: &str,
        url: Option<&str>,
    ) -> SyncResult<NativeNode> {
        let parent_url: Option<Option<String>> = conn
            .query_row(
                "SELECT url FROM nodes WHERE id = ?1",
                params![parent.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match parent_url {
            None => return Err(SyncError::Storage(format!("parent not found: {parent}"))),
            Some(Some(_)) => {
                return Err(SyncError::Storage(format!("parent {parent} is not a folder")));
            }
            Some(None) => {}
        }

        let id = NodeId::new();
        conn.execute(
            "INSERT INTO nodes (id, parent_id, position, title, url)
             VALUES (?1, ?2, (SELECT COALESCE(MAX(position) + 1, 0) FROM nodes WHERE parent_id = ?2), ?3, ?4)",
            params![id.to_string(), parent.to_string(), title, url],
        )?;

        Ok(match url {
            Some(url) => NativeNode::leaf(id, Some(parent), title, url),
            None => NativeNode::folder(id, Some(parent), title),
        })
    }

    /// Adds a folder under `parent`.
    pub fn add_folder(&self, parent: NodeId, title: &str) -> SyncResult<NodeId> {
        let conn = self.lock()?;
        Ok(Self::insert_locked(&conn, parent, title, None)?.id)
    }

    /// Adds a leaf under `parent`.
    pub fn add_leaf(&self, parent: NodeId, title: &str, url: &str) -> SyncResult<NodeId> {
        let conn = self.lock()?;
        Ok(Self::insert_locked(&conn, parent, title, Some(url))?.id)
    }
}

fn parse_id(s: &str) -> SyncResult<NodeId> {
    NodeId::parse(s).map_err(|e| SyncError::Storage(format!("corrupt node id {s:?}: {e}")))
}

#[async_trait]
impl BookmarkTree for SqliteBookmarkTree {
    async fn get_tree(&self) -> SyncResult<NodeArena> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, parent_id, title, url FROM nodes ORDER BY position, rowid",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut root = None;
        let mut order = Vec::with_capacity(rows.len());
        let mut nodes = HashMap::with_capacity(rows.len());
        for (id, parent_id, title, url) in rows {
            let id = parse_id(&id)?;
            let parent_id = parent_id.as_deref().map(parse_id).transpose()?;
            if parent_id.is_none() {
                root = Some(id);
            }
            order.push((id, parent_id));
            nodes.insert(
                id,
                NativeNode {
                    id,
                    parent_id,
                    title,
                    url,
                    children: Vec::new(),
                },
            );
        }

        for (id, parent_id) in order {
            if let Some(parent) = parent_id.and_then(|p| nodes.get_mut(&p)) {
                parent.children.push(id);
            }
        }

        let root = root.ok_or_else(|| SyncError::Storage("root folder is missing".to_string()))?;
        Ok(NodeArena { root, nodes })
    }

    async fn create(&self, title: &str, url: &str) -> SyncResult<NativeNode> {
        let conn = self.lock()?;
        let root = Self::root_id_locked(&conn)?;
        Self::insert_locked(&conn, root, title, Some(url))
    }

    async fn remove(&self, id: &NodeId) -> SyncResult<()> {
        let conn = self.lock()?;
        let url: Option<Option<String>> = conn
            .query_row(
                "SELECT url FROM nodes WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match url {
            None => Err(SyncError::Storage(format!("node not found: {id}"))),
            Some(None) => Err(SyncError::Storage(format!("refusing to remove folder {id}"))),
            Some(Some(_)) => {
                conn.execute("DELETE FROM nodes WHERE id = ?1", params![id.to_string()])?;
                Ok(())
            }
        }
    }
}
