use crate::{
    model::ModelKey,
    store::{FieldStorage, Pk, Store, StoreError, keys},
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

type Data = BTreeMap<String, Entry>;

///
/// Entry
///
/// One value of the key space.
///

#[derive(Clone, Debug)]
enum Entry {
    Str(String),
    Hash(BTreeMap<String, String>),
    Set(BTreeSet<String>),
    List(Vec<String>),
    ZSet(BTreeMap<String, f64>),
}

impl Entry {
    fn empty_collection(storage: FieldStorage) -> Option<Self> {
        match storage {
            FieldStorage::Set => Some(Self::Set(BTreeSet::new())),
            FieldStorage::List => Some(Self::List(Vec::new())),
            FieldStorage::SortedSet => Some(Self::ZSet(BTreeMap::new())),
            FieldStorage::String | FieldStorage::Hash => None,
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            Self::Str(_) => false,
            Self::Hash(h) => h.is_empty(),
            Self::Set(s) => s.is_empty(),
            Self::List(l) => l.is_empty(),
            Self::ZSet(z) => z.is_empty(),
        }
    }

    // Members in stored order; sorted sets by (score, member).
    fn values(&self) -> Vec<String> {
        match self {
            Self::Str(v) => vec![v.clone()],
            Self::Hash(h) => h.values().cloned().collect(),
            Self::Set(s) => s.iter().cloned().collect(),
            Self::List(l) => l.clone(),
            Self::ZSet(z) => {
                let mut scored: Vec<(&String, f64)> = z.iter().map(|(m, s)| (m, *s)).collect();
                scored.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(b.0)));
                scored.into_iter().map(|(m, _)| m.clone()).collect()
            }
        }
    }

    const fn holds(&self, storage: FieldStorage) -> bool {
        matches!(
            (self, storage),
            (Self::Set(_), FieldStorage::Set)
                | (Self::List(_), FieldStorage::List)
                | (Self::ZSet(_), FieldStorage::SortedSet)
        )
    }
}

///
/// MemoryStore
///
/// In-process emulation of a redis-like key space.
/// Each trait call takes the lock once, so every primitive is atomic.
///

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Data>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held, field indexes included.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.read().len()
    }

    /// Return true if the raw key exists.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    fn read(&self) -> RwLockReadGuard<'_, Data> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Data> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Store for MemoryStore {
    fn exists(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        record_exists(&self.read(), model, pk)
    }

    fn create(&self, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
        let mut data = self.write();
        let key = keys::collection(model);

        match data
            .entry(key.clone())
            .or_insert_with(|| Entry::Set(BTreeSet::new()))
        {
            Entry::Set(pks) => Ok(pks.insert(pk.to_string())),
            _ => Err(wrong_type(key, FieldStorage::Set)),
        }
    }

    fn get(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Option<String>, StoreError> {
        read_single(&self.read(), model, pk, field, storage)
    }

    fn set(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        value: &str,
    ) -> Result<Option<String>, StoreError> {
        let mut data = self.write();
        require_record(&data, model, pk)?;

        write_single(&mut data, model, pk, field, storage, Some(value))
    }

    fn clear(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<bool, StoreError> {
        let mut data = self.write();
        let previous = write_single(&mut data, model, pk, field, storage, None)?;

        Ok(previous.is_some())
    }

    fn clear_if(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        expected: &str,
    ) -> Result<bool, StoreError> {
        let mut data = self.write();
        if read_single(&data, model, pk, field, storage)?.as_deref() != Some(expected) {
            return Ok(false);
        }
        write_single(&mut data, model, pk, field, storage, None)?;

        Ok(true)
    }

    fn members(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
    ) -> Result<Vec<String>, StoreError> {
        let data = self.read();
        let key = keys::field(model, pk, field);

        match data.get(&key) {
            None if storage.is_collection() => Ok(Vec::new()),
            Some(entry) if entry.holds(storage) => Ok(entry.values()),
            _ => Err(wrong_type(key, storage)),
        }
    }

    fn add_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
        score: Option<f64>,
    ) -> Result<bool, StoreError> {
        let mut data = self.write();
        require_record(&data, model, pk)?;

        let key = keys::field(model, pk, field);
        let Some(empty) = Entry::empty_collection(storage) else {
            return Err(wrong_type(key, storage));
        };

        let added = match data.entry(key.clone()).or_insert(empty) {
            Entry::Set(s) if storage == FieldStorage::Set => s.insert(member.to_string()),
            Entry::List(l) if storage == FieldStorage::List => {
                l.push(member.to_string());
                true
            }
            Entry::ZSet(z) if storage == FieldStorage::SortedSet => z
                .insert(member.to_string(), score.unwrap_or_default())
                .is_none(),
            _ => return Err(wrong_type(key, storage)),
        };
        index_add(&mut data, model, field, member, pk);

        Ok(added)
    }

    fn remove_member(
        &self,
        model: &ModelKey,
        pk: &Pk,
        field: &str,
        storage: FieldStorage,
        member: &str,
    ) -> Result<bool, StoreError> {
        let mut data = self.write();
        let key = keys::field(model, pk, field);

        let removed = match data.get_mut(&key) {
            None => false,
            Some(Entry::Set(s)) if storage == FieldStorage::Set => s.remove(member),
            Some(Entry::List(l)) if storage == FieldStorage::List => {
                let before = l.len();
                l.retain(|m| m != member);
                l.len() != before
            }
            Some(Entry::ZSet(z)) if storage == FieldStorage::SortedSet => {
                z.remove(member).is_some()
            }
            Some(_) => return Err(wrong_type(key, storage)),
        };

        if data.get(&key).is_some_and(Entry::is_empty) {
            data.remove(&key);
        }
        if removed {
            index_remove(&mut data, model, field, member, pk);
        }

        Ok(removed)
    }

    fn delete(
        &self,
        model: &ModelKey,
        pk: &Pk,
        fields: &[(&str, FieldStorage)],
    ) -> Result<bool, StoreError> {
        let mut data = self.write();
        let existed = record_exists(&data, model, pk)?;

        // read every field first; nothing is touched if one has the wrong type
        let mut staged = Vec::with_capacity(fields.len());
        for &(field, storage) in fields {
            let values = if storage.is_collection() {
                let key = keys::field(model, pk, field);
                match data.get(&key) {
                    None => Vec::new(),
                    Some(entry) if entry.holds(storage) => entry.values(),
                    Some(_) => return Err(wrong_type(key, storage)),
                }
            } else {
                read_single(&data, model, pk, field, storage)?
                    .into_iter()
                    .collect()
            };
            staged.push((field, storage, values));
        }

        for (field, storage, values) in staged {
            if storage != FieldStorage::Hash {
                data.remove(&keys::field(model, pk, field));
            }
            for value in values {
                index_remove(&mut data, model, field, &value, pk);
            }
        }
        data.remove(&keys::record_hash(model, pk));

        let collection_key = keys::collection(model);
        if let Some(Entry::Set(pks)) = data.get_mut(&collection_key) {
            pks.remove(pk.as_str());
            if pks.is_empty() {
                data.remove(&collection_key);
            }
        }

        Ok(existed)
    }

    fn query_by_field(
        &self,
        model: &ModelKey,
        field: &str,
        value: &str,
    ) -> Result<BTreeSet<Pk>, StoreError> {
        let data = self.read();
        let key = keys::index(model, field, value);

        match data.get(&key) {
            None => Ok(BTreeSet::new()),
            Some(Entry::Set(pks)) => Ok(pks.iter().map(|pk| Pk::from(pk.as_str())).collect()),
            Some(_) => Err(wrong_type(key, FieldStorage::Set)),
        }
    }
}

const fn wrong_type(key: String, expected: FieldStorage) -> StoreError {
    StoreError::WrongType { key, expected }
}

fn record_exists(data: &Data, model: &ModelKey, pk: &Pk) -> Result<bool, StoreError> {
    let key = keys::collection(model);

    match data.get(&key) {
        None => Ok(false),
        Some(Entry::Set(pks)) => Ok(pks.contains(pk.as_str())),
        Some(_) => Err(wrong_type(key, FieldStorage::Set)),
    }
}

fn require_record(data: &Data, model: &ModelKey, pk: &Pk) -> Result<(), StoreError> {
    if record_exists(data, model, pk)? {
        Ok(())
    } else {
        Err(StoreError::MissingRecord {
            model: model.clone(),
            pk: pk.clone(),
        })
    }
}

fn read_single(
    data: &Data,
    model: &ModelKey,
    pk: &Pk,
    field: &str,
    storage: FieldStorage,
) -> Result<Option<String>, StoreError> {
    match storage {
        FieldStorage::String => {
            let key = keys::field(model, pk, field);
            match data.get(&key) {
                None => Ok(None),
                Some(Entry::Str(v)) => Ok(Some(v.clone())),
                Some(_) => Err(wrong_type(key, storage)),
            }
        }
        FieldStorage::Hash => {
            let key = keys::record_hash(model, pk);
            match data.get(&key) {
                None => Ok(None),
                Some(Entry::Hash(h)) => Ok(h.get(field).cloned()),
                Some(_) => Err(wrong_type(key, storage)),
            }
        }
        FieldStorage::Set | FieldStorage::List | FieldStorage::SortedSet => {
            Err(wrong_type(keys::field(model, pk, field), storage))
        }
    }
}

// Write or clear a single-valued field and keep its index in step.
fn write_single(
    data: &mut Data,
    model: &ModelKey,
    pk: &Pk,
    field: &str,
    storage: FieldStorage,
    value: Option<&str>,
) -> Result<Option<String>, StoreError> {
    let previous = read_single(data, model, pk, field, storage)?;

    if storage == FieldStorage::String {
        let key = keys::field(model, pk, field);
        match value {
            Some(v) => {
                data.insert(key, Entry::Str(v.to_string()));
            }
            None => {
                data.remove(&key);
            }
        }
    } else {
        let key = keys::record_hash(model, pk);
        match value {
            Some(v) => {
                if let Entry::Hash(h) = data
                    .entry(key)
                    .or_insert_with(|| Entry::Hash(BTreeMap::new()))
                {
                    h.insert(field.to_string(), v.to_string());
                }
            }
            None => {
                if let Some(Entry::Hash(h)) = data.get_mut(&key) {
                    h.remove(field);
                    if h.is_empty() {
                        data.remove(&key);
                    }
                }
            }
        }
    }

    if let Some(old) = &previous {
        index_remove(data, model, field, old, pk);
    }
    if let Some(v) = value {
        index_add(data, model, field, v, pk);
    }

    Ok(previous)
}

fn index_add(data: &mut Data, model: &ModelKey, field: &str, value: &str, pk: &Pk) {
    let key = keys::index(model, field, value);
    if let Entry::Set(pks) = data.entry(key).or_insert_with(|| Entry::Set(BTreeSet::new())) {
        pks.insert(pk.to_string());
    }
}

fn index_remove(data: &mut Data, model: &ModelKey, field: &str, value: &str, pk: &Pk) {
    let key = keys::index(model, field, value);
    if let Some(Entry::Set(pks)) = data.get_mut(&key) {
        pks.remove(pk.as_str());
        if pks.is_empty() {
            data.remove(&key);
        }
    }
}

///
/// TESTS
///
