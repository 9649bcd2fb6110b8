use std::{
    collections::HashMap,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use slipway_model::{Route, SearchPath, Table};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{DnsFlush, SystemFlusher};

/// In-memory store of named route tables and the DNS search path.
///
/// A table replace is a single map insert of a fully built table, so readers observe
/// either the old or the new table, never a mix.
pub struct Interceptor {
    tables: RwLock<HashMap<String, Arc<Table>>>,
    search: RwLock<SearchPath>,
    flusher: Arc<dyn DnsFlush>,
    generation: watch::Sender<u64>,
}

impl Default for Interceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor {
    pub fn new() -> Self {
        Self::with_flusher(Arc::new(SystemFlusher))
    }

    pub fn with_flusher(flusher: Arc<dyn DnsFlush>) -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            search: RwLock::new(SearchPath::default()),
            flusher,
            generation: watch::Sender::new(0),
        }
    }

    /// Pretty JSON of the table named `name`.
    pub fn render(&self, name: &str) -> Option<String> {
        let table = self.table(name)?;
        // Serializing plain strings and enums cannot fail.
        serde_json::to_string_pretty(&*table).ok()
    }

    /// Replaces (or creates) the table with the same name, then flushes resolver caches.
    pub async fn update(&self, table: Table) {
        let name = table.name.clone();
        let routes = table.routes.len();
        self.write_tables().insert(name.clone(), Arc::new(table));
        info!(table = %name, routes, "table updated");

        self.bump();
        self.flusher.flush().await;
    }

    /// Removes the table and flushes resolver caches. Returns `false` if there was none.
    pub async fn delete(&self, name: &str) -> bool {
        let removed = self.write_tables().remove(name).is_some();
        if removed {
            info!(table = %name, "table deleted");
            self.bump();
            self.flusher.flush().await;
        }
        removed
    }

    pub fn search_path(&self) -> SearchPath {
        self.search
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_search_path(&self, paths: SearchPath) {
        debug!(search = ?paths.as_slice(), "search path replaced");
        *self
            .search
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = paths;
        self.bump();
    }

    pub fn table(&self, name: &str) -> Option<Arc<Table>> {
        self.read_tables().get(name).cloned()
    }

    /// Every table, ordered by name.
    pub fn tables(&self) -> Vec<Arc<Table>> {
        let mut tables: Vec<Arc<Table>> = self.read_tables().values().cloned().collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        tables
    }

    /// Finds the route for a DNS query.
    ///
    /// Unqualified names are also tried with every search suffix, in order. Tables are
    /// consulted in name order.
    pub fn resolve(&self, name: &str) -> Option<Route> {
        let candidates = self.search_path().candidates(name);
        let tables = self.tables();
        candidates.iter().find_map(|candidate| {
            tables
                .iter()
                .find_map(|table| table.lookup(candidate).cloned())
        })
    }

    /// Finds the route owning a virtual address.
    pub fn route_by_ip(&self, ip: &str) -> Option<Route> {
        self.tables()
            .iter()
            .find_map(|table| table.lookup_ip(ip).cloned())
    }

    /// Every route whose traffic must be redirected to the proxy.
    pub fn redirects(&self) -> Vec<Route> {
        self.tables()
            .iter()
            .flat_map(|table| table.redirects().cloned())
            .collect()
    }

    /// Generation counter, bumped after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    fn bump(&self) {
        self.generation.send_modify(|g| *g += 1);
    }

    fn read_tables(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Table>>> {
        self.tables
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_tables(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Table>>> {
        self.tables
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
