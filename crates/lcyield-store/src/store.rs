use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use lcyield_core::schema::{ColumnType, Field, Schema};
use lcyield_core::types::{ColumnData, Value};
use lcyield_io::{Codec, RecordFile, RecordFileWriter, Storage};
use tracing::{debug, error, info};

use crate::cell::ColumnRef;
use crate::cut::Cut;
use crate::error::{Error, Result};
use crate::iter::Entries;
use crate::scoped::{ScopedStore, ScratchFile};

struct Source {
    path: String,
    file: RecordFile,
}

struct Friend {
    name: String,
    file: RecordFile,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Origin {
    Primary(String),
    Friend(usize, String),
}

struct Binding {
    origin: Origin,
    ty: ColumnType,
    cell: ColumnRef,
    active: bool,
}

/// Ordered record files read as one table, plus row-aligned friends.
pub struct EventStore {
    name: String,
    storage: Arc<dyn Storage>,
    scratch_dir: PathBuf,
    show_progress: bool,

    sources: Vec<Source>,
    missing: Vec<String>,
    /// First global row of each source.
    offsets: Vec<u64>,
    entries: u64,
    friends: Vec<Friend>,

    schema: Schema,
    bindings: BTreeMap<String, Binding>,
    active: Vec<String>,

    chunk: Option<usize>,
    chunk_data: HashMap<String, ColumnData>,
    friend_data: HashMap<String, ColumnData>,
    pub(crate) cursor: Option<u64>,
}

impl EventStore {
    pub fn new(name: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self {
            name: name.into(),
            storage,
            scratch_dir: std::env::temp_dir(),
            show_progress: false,
            sources: Vec::new(),
            missing: Vec::new(),
            offsets: Vec::new(),
            entries: 0,
            friends: Vec::new(),
            schema: Schema::default(),
            bindings: BTreeMap::new(),
            active: Vec::new(),
            chunk: None,
            chunk_data: HashMap::new(),
            friend_data: HashMap::new(),
            cursor: None,
        }
    }

    /// Parent directory for the scratch areas of filtered copies.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    pub fn entries(&self) -> u64 {
        self.entries
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn source_paths(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.path.as_str()).collect()
    }

    pub fn missing_sources(&self) -> &[String] {
        &self.missing
    }

    pub fn has_friend(&self, name: &str) -> bool {
        self.friends.iter().any(|f| f.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.bindings.get(name).map(|b| b.active).unwrap_or(false)
    }

    pub fn active_columns(&self) -> &[String] {
        &self.active
    }

    pub(crate) fn show_progress(&self) -> bool {
        self.show_progress
    }

    /// Append a source file to the chain.
    ///
    /// A missing file is logged and remembered; it surfaces as `NotFound` on
    /// the next iteration or access. A malformed file fails immediately.
    pub fn add(&mut self, path: &str) -> Result<()> {
        match RecordFile::open(self.storage.clone(), path) {
            Ok(file) => {
                debug!(store = %self.name, path, rows = file.n_rows(), "added source");
                for arr in file.array_columns() {
                    debug!(store = %self.name, column = arr, "skipping array column");
                }
                self.sources.push(Source {
                    path: path.to_string(),
                    file,
                });
            }
            Err(lcyield_io::Error::NotFound(_)) => {
                error!(store = %self.name, path, "source file not found");
                self.missing.push(path.to_string());
            }
            Err(e) => return Err(e.into()),
        }
        self.recount();
        self.rebuild_schema();
        Ok(())
    }

    /// Attach a row-aligned table whose columns join this store's schema.
    ///
    /// On a name collision the primary column wins; the friend's column stays
    /// reachable as `name.column`.
    pub fn add_friend(&mut self, name: &str, path: &str) -> Result<()> {
        if self.has_friend(name) {
            return Err(Error::Schema(format!(
                "friend '{name}' already attached to '{}'",
                self.name
            )));
        }
        let file = RecordFile::open(self.storage.clone(), path)?;
        if file.n_rows() != self.entries {
            return Err(Error::Mismatch {
                friend: name.to_string(),
                expected: self.entries,
                found: file.n_rows(),
            });
        }
        debug!(store = %self.name, friend = name, path, "attached friend");
        self.friends.push(Friend {
            name: name.to_string(),
            file,
        });
        self.rebuild_schema();
        Ok(())
    }

    fn recount(&mut self) {
        self.offsets.clear();
        let mut total = 0u64;
        for s in &self.sources {
            self.offsets.push(total);
            total += s.file.n_rows();
        }
        self.entries = total;
    }

    fn rebuild_schema(&mut self) {
        let mut resolved: Vec<(String, Origin, ColumnType)> = Vec::new();
        let mut fields: Vec<Field> = Vec::new();

        if let Some(first) = self.sources.first() {
            for f in first.file.schema().fields {
                resolved.push((f.name.clone(), Origin::Primary(f.name.clone()), f.column_type));
                fields.push(f);
            }
        }
        for (idx, friend) in self.friends.iter().enumerate() {
            for f in friend.file.schema().fields {
                let qualified = format!("{}.{}", friend.name, f.name);
                resolved.push((qualified, Origin::Friend(idx, f.name.clone()), f.column_type));
                if !fields.iter().any(|existing| existing.name == f.name) {
                    resolved.push((f.name.clone(), Origin::Friend(idx, f.name.clone()), f.column_type));
                    fields.push(f);
                }
            }
        }

        let mut old = std::mem::take(&mut self.bindings);
        for (key, origin, ty) in resolved {
            let binding = match old.remove(&key) {
                Some(b) if b.ty == ty => Binding { origin, ..b },
                _ => Binding {
                    origin,
                    ty,
                    cell: ColumnRef::new(&key, Value::zero(ty)),
                    active: false,
                },
            };
            self.bindings.insert(key, binding);
        }
        self.active.retain(|k| self.bindings.get(k).map(|b| b.active).unwrap_or(false));
        self.schema = Schema::new(fields);

        self.chunk = None;
        self.chunk_data.clear();
        self.friend_data.clear();
        self.cursor = None;
    }

    /// Activate columns for reading. Names ending in `*` select every column
    /// with that prefix (`"*"` selects all). Unless `append`, all other
    /// columns are deactivated first. An unknown name leaves the active set
    /// unchanged.
    pub fn activate_columns<I, S>(&mut self, names: I, append: bool) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut wanted: Vec<String> = Vec::new();
        for pattern in names {
            let pattern = pattern.as_ref();
            if let Some(prefix) = pattern.strip_suffix('*') {
                wanted.extend(
                    self.schema
                        .fields
                        .iter()
                        .filter(|f| f.name.starts_with(prefix))
                        .map(|f| f.name.clone()),
                );
            } else if self.bindings.contains_key(pattern) {
                wanted.push(pattern.to_string());
            } else {
                return Err(Error::UnknownColumn(pattern.to_string()));
            }
        }

        if !append {
            for b in self.bindings.values_mut() {
                b.active = false;
            }
            self.active.clear();
            self.chunk_data.clear();
            self.friend_data.clear();
        }
        for key in wanted {
            if let Some(b) = self.bindings.get_mut(&key) {
                if !b.active {
                    b.active = true;
                    self.active.push(key);
                }
            }
        }
        debug!(store = %self.name, active = self.active.len(), append, "activated columns");

        if let Some(n) = self.cursor {
            self.load_entry(n)?;
        }
        Ok(())
    }

    /// Fails with `NotFound` for a missing source and `Mismatch` for a
    /// misaligned friend.
    pub fn validate(&self) -> Result<()> {
        if let Some(path) = self.missing.first() {
            return Err(Error::NotFound(path.clone()));
        }
        for f in &self.friends {
            if f.file.n_rows() != self.entries {
                return Err(Error::Mismatch {
                    friend: f.name.clone(),
                    expected: self.entries,
                    found: f.file.n_rows(),
                });
            }
        }
        Ok(())
    }

    pub(crate) fn load_entry(&mut self, n: u64) -> Result<()> {
        if n >= self.entries {
            return Err(Error::EntryOutOfRange {
                entry: n,
                entries: self.entries,
            });
        }
        let src = self.offsets.partition_point(|&o| o <= n) - 1;
        let local = (n - self.offsets[src]) as usize;

        if self.chunk != Some(src) {
            self.chunk_data.clear();
            self.chunk = Some(src);
        }

        for key in &self.active {
            let Some(b) = self.bindings.get(key) else {
                continue;
            };
            let value = match &b.origin {
                Origin::Primary(column) => {
                    if !self.chunk_data.contains_key(key) {
                        let data = self.sources[src].file.read_column(column)?;
                        self.chunk_data.insert(key.clone(), data);
                    }
                    self.chunk_data.get(key).and_then(|d| d.get(local))
                }
                Origin::Friend(idx, column) => {
                    if !self.friend_data.contains_key(key) {
                        let data = self.friends[*idx].file.read_column(column)?;
                        self.friend_data.insert(key.clone(), data);
                    }
                    self.friend_data.get(key).and_then(|d| d.get(n as usize))
                }
            };
            let value = value.ok_or_else(|| {
                Error::Schema(format!("column '{key}' is shorter than its table"))
            })?;
            b.cell.set(value);
        }
        self.cursor = Some(n);
        Ok(())
    }

    /// Position the cursor on row `n` and load every active column.
    pub fn set_entry(&mut self, n: u64) -> Result<()> {
        self.validate()?;
        self.load_entry(n)
    }

    /// Lazy, restartable walk over all rows; the cursor follows it.
    pub fn iterate(&mut self) -> Entries<'_> {
        Entries::new(self)
    }

    fn binding(&self, column: &str) -> Result<&Binding> {
        let b = self
            .bindings
            .get(column)
            .ok_or_else(|| Error::UnknownColumn(column.to_string()))?;
        if !b.active {
            return Err(Error::InactiveColumn(column.to_string()));
        }
        Ok(b)
    }

    /// Current-row value of an active column.
    pub fn value(&self, column: &str) -> Result<Value> {
        let b = self.binding(column)?;
        self.validate()?;
        if self.cursor.is_none() {
            return Err(Error::NoEntry);
        }
        Ok(b.cell.get())
    }

    /// Stable cell bound to an active column.
    pub fn value_ref(&self, column: &str) -> Result<ColumnRef> {
        Ok(self.binding(column)?.cell.clone())
    }

    /// Materialize the rows for which `predicate` holds into a scoped
    /// temporary record file carrying every active column.
    ///
    /// The predicate usually reads cells obtained from [`value_ref`](Self::value_ref).
    pub fn copy_filtered<F>(&mut self, mut predicate: F) -> Result<ScopedStore>
    where
        F: FnMut() -> bool,
    {
        if self.active.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "no active columns to copy from '{}'",
                self.name
            )));
        }
        let scratch = ScratchFile::create(self.storage.clone(), &self.scratch_dir, &self.name)?;

        let keys = self.active.clone();
        let mut columns: Vec<(ColumnRef, ColumnData)> = keys
            .iter()
            .map(|k| {
                let b = self.binding(k)?;
                Ok((b.cell.clone(), ColumnData::with_capacity(b.ty, 0)))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut kept = 0u64;
        let mut rows = self.iterate();
        while let Some(entry) = rows.next() {
            entry?;
            if predicate() {
                for (cell, data) in columns.iter_mut() {
                    data.push(cell.get());
                }
                kept += 1;
            }
        }

        let mut writer = RecordFileWriter::new(Codec::None);
        for (key, (_, data)) in keys.iter().zip(columns) {
            writer.add_column(key.as_str(), data)?;
        }
        writer.write(self.storage.as_ref(), scratch.path())?;
        info!(store = %self.name, kept, of = self.entries, path = scratch.path(), "wrote filtered copy");

        let mut store = EventStore::new(format!("{}_selected", self.name), self.storage.clone())
            .with_scratch_dir(self.scratch_dir.clone())
            .with_progress(self.show_progress);
        store.add(scratch.path())?;
        store.activate_columns(["*"], false)?;
        Ok(ScopedStore::new(store, scratch))
    }

    /// [`copy_filtered`](Self::copy_filtered) with a cut expression. The
    /// cut's columns are activated in addition to the current set.
    pub fn copy_selected(&mut self, cut: &str) -> Result<ScopedStore> {
        let parsed = Cut::parse(cut)?;
        self.activate_columns(parsed.columns(), true)?;
        let bound = parsed.bind(self)?;
        self.copy_filtered(move || bound.eval())
    }

    /// Number of rows passing `cut`. The cut's columns are activated in
    /// addition to the current set.
    pub fn count(&mut self, cut: &str) -> Result<u64> {
        let parsed = Cut::parse(cut)?;
        if parsed.is_empty() {
            self.validate()?;
            return Ok(self.entries);
        }
        self.activate_columns(parsed.columns(), true)?;
        let bound = parsed.bind(self)?;
        let mut n = 0u64;
        for entry in self.iterate() {
            entry?;
            if bound.eval() {
                n += 1;
            }
        }
        Ok(n)
    }
}

impl std::fmt::Debug for EventStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStore")
            .field("name", &self.name)
            .field("sources", &self.source_paths())
            .field("missing", &self.missing)
            .field("entries", &self.entries)
            .field("active", &self.active)
            .finish()
    }
}
