/*!
Persistent baseline of every subdomain seen so far

Both backends are append-only: `persist` adds the names it is given and never removes any,
so a name that disappears from the sources stays known and will not be reported again if it
comes back.
*/

use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use fs2::FileExt;
use rusqlite::Connection;
use tracing::{debug, info, warn};

use super::BoxError;
use super::config::{BaselineBackend, BaselineConfig};
use super::normalizer::Normalizer;
use super::subdomain::SubdomainSet;

/// Storage for the set of already-known subdomains
#[async_trait]
pub trait BaselineStore: Send + Sync {
    /// Name of the backend
    fn name(&self) -> &'static str;

    /// Everything known so far. A store that does not exist yet is empty, not an error.
    async fn load(&self) -> Result<SubdomainSet, BoxError>;

    /// Durably add `subdomains` to the store. Re-running with the same input is a no-op.
    async fn persist(&self, subdomains: &SubdomainSet) -> Result<(), BoxError>;

    /// Names in `current` that the store does not know yet
    async fn diff(&self, current: &SubdomainSet) -> Result<SubdomainSet, BoxError> {
        Ok(current.difference(&self.load().await?))
    }
}

pub fn open_store(config: &BaselineConfig) -> Result<Box<dyn BaselineStore>, BoxError> {
    let path = config.resolved_path();
    let store: Box<dyn BaselineStore> = match config.backend {
        BaselineBackend::Text => Box::new(TextBaselineStore::new(path.clone())),
        BaselineBackend::Sqlite => Box::new(SqliteBaselineStore::open(&path)?),
    };
    info!("Baseline store: {} at {:?}", store.name(), path);
    Ok(store)
}

/// Write `content` next to `path` and rename it into place, so readers never see a
/// truncated file
pub(crate) fn write_atomically(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let tmp_path = sibling(path, "tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(content)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// Plain text, one subdomain per line
pub struct TextBaselineStore {
    path: PathBuf,
    normalizer: Normalizer,
}

impl TextBaselineStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            normalizer: Normalizer::default(),
        }
    }
}

/// Lines that are not valid UTF-8 cannot be hostnames and are skipped, so one bad byte never
/// hides the rest of the file
fn read_baseline(path: &Path, normalizer: Normalizer) -> Result<SubdomainSet, BoxError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SubdomainSet::new()),
        Err(e) => return Err(format!("cannot read baseline {}: {}", path.display(), e).into()),
    };

    let mut lines = Vec::new();
    for (index, raw) in bytes.split(|&b| b == b'\n').enumerate() {
        match std::str::from_utf8(raw) {
            Ok(line) => lines.push(line),
            Err(_) => warn!(
                "Skipping line {} of {}: not valid UTF-8",
                index + 1,
                path.display()
            ),
        }
    }
    Ok(normalizer.collect_lines(lines))
}

fn append_to_baseline(
    path: &Path,
    normalizer: Normalizer,
    subdomains: &SubdomainSet,
) -> Result<usize, BoxError> {
    // Serialize concurrent writers on a side file; the baseline itself gets replaced
    let lock = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(sibling(path, "lock"))?;
    lock.lock_exclusive()?;

    let result = (|| -> Result<usize, BoxError> {
        let mut known = read_baseline(path, normalizer)?;
        let before = known.len();
        known.extend(subdomains.iter().cloned());
        if known.len() != before {
            write_atomically(path, known.to_lines().as_bytes())?;
        }
        Ok(known.len() - before)
    })();

    FileExt::unlock(&lock)?;
    result
}

#[async_trait]
impl BaselineStore for TextBaselineStore {
    fn name(&self) -> &'static str {
        "text"
    }

    async fn load(&self) -> Result<SubdomainSet, BoxError> {
        let path = self.path.clone();
        let normalizer = self.normalizer;
        let known = tokio::task::spawn_blocking(move || read_baseline(&path, normalizer)).await??;
        debug!("Loaded {} known subdomains from {:?}", known.len(), self.path);
        Ok(known)
    }

    async fn persist(&self, subdomains: &SubdomainSet) -> Result<(), BoxError> {
        if subdomains.is_empty() {
            return Ok(());
        }

        let path = self.path.clone();
        let normalizer = self.normalizer;
        let subdomains = subdomains.clone();
        let added = tokio::task::spawn_blocking(move || {
            append_to_baseline(&path, normalizer, &subdomains)
        })
        .await??;
        info!("Added {} new subdomains to the baseline", added);
        Ok(())
    }
}

/// SQLite table of subdomains with the time each was first seen
pub struct SqliteBaselineStore {
    conn: Arc<Mutex<Connection>>,
    normalizer: Normalizer,
}

impl SqliteBaselineStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, BoxError> {
        let conn = Connection::open(path.as_ref())?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, BoxError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, BoxError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS subdomains (
                subdomain TEXT PRIMARY KEY,
                first_seen INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_subdomains_first_seen ON subdomains(first_seen);
            "#,
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            normalizer: Normalizer::default(),
        })
    }
}

fn lock_connection(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, BoxError> {
    conn.lock().map_err(|_| "baseline connection poisoned".into())
}

fn select_names(conn: &Mutex<Connection>) -> Result<Vec<String>, BoxError> {
    let conn = lock_connection(conn)?;
    let mut stmt = conn.prepare("SELECT subdomain FROM subdomains")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

fn insert_names(conn: &Mutex<Connection>, subdomains: &SubdomainSet) -> Result<usize, BoxError> {
    let mut conn = lock_connection(conn)?;
    let now = chrono::Utc::now().timestamp();
    let tx = conn.transaction()?;
    let mut added = 0;
    {
        let mut stmt =
            tx.prepare("INSERT OR IGNORE INTO subdomains (subdomain, first_seen) VALUES (?1, ?2)")?;
        for subdomain in subdomains {
            added += stmt.execute((subdomain.as_str(), now))?;
        }
    }
    tx.commit()?;
    Ok(added)
}

#[async_trait]
impl BaselineStore for SqliteBaselineStore {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load(&self) -> Result<SubdomainSet, BoxError> {
        let conn = Arc::clone(&self.conn);
        let names = tokio::task::spawn_blocking(move || select_names(&conn)).await??;

        let known = self.normalizer.collect_lines(names.iter().map(String::as_str));
        debug!("Retrieved {} subdomains from the database", known.len());
        Ok(known)
    }

    async fn persist(&self, subdomains: &SubdomainSet) -> Result<(), BoxError> {
        if subdomains.is_empty() {
            return Ok(());
        }

        let conn = Arc::clone(&self.conn);
        let subdomains = subdomains.clone();
        let added =
            tokio::task::spawn_blocking(move || insert_names(&conn, &subdomains)).await??;

        info!("Added {} new subdomains to the database", added);
        Ok(())
    }
}
