//! In-process cache transport backed by `DashMap`.
//!
//! Mirrors the subset of Redis semantics the counter cache relies on: string
//! values with expiry, integer hash fields with atomic increment, string sets
//! and glob key patterns. Per-key atomicity comes from the map's shard locks.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;

use crate::cache::{CacheError, CacheTransport};
use crate::config::settings::MemoryCacheConfig;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, i64>),
    Set(HashSet<String>),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Hash(_) => "hash",
            Value::Set(_) => "set",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

fn wrong_type(key: &str, expected: &str, found: &Value) -> CacheError {
    CacheError::Operation(format!(
        "WRONGTYPE key '{}' holds a {}, expected {}",
        key,
        found.type_name(),
        expected
    ))
}

/// In-memory transport with an entry cap.
pub struct MemoryTransport {
    entries: DashMap<String, Entry>,
    max_entries: usize,
}

impl MemoryTransport {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: config.max_entries,
        }
    }

    /// Live (unexpired) entry count.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn purge_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    /// Make room for one more key, failing when the cap is reached.
    fn ensure_capacity(&self, key: &str) -> Result<(), CacheError> {
        if self.entries.contains_key(key) || self.entries.len() < self.max_entries {
            return Ok(());
        }
        self.purge_expired();
        if self.entries.len() < self.max_entries {
            Ok(())
        } else {
            Err(CacheError::Operation(format!(
                "memory cache is full ({} entries)",
                self.max_entries
            )))
        }
    }

    /// Read a live entry, dropping it when expired.
    fn read<T>(
        &self,
        key: &str,
        f: impl FnOnce(&Value) -> Result<T, CacheError>,
    ) -> Result<Option<T>, CacheError> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => true,
            Some(entry) => return f(&entry.value).map(Some),
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    /// Mutate the entry for `key`, creating it with `init` when missing or expired.
    fn upsert<T>(
        &self,
        key: &str,
        init: impl FnOnce() -> Value,
        f: impl FnOnce(&mut Value) -> Result<T, CacheError>,
    ) -> Result<T, CacheError> {
        self.ensure_capacity(key)?;
        let now = Instant::now();
        match self.entries.entry(key.to_string()) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_expired(now) {
                    *occupied.get_mut() = Entry::new(init(), None);
                }
                f(&mut occupied.get_mut().value)
            }
            MapEntry::Vacant(vacant) => {
                let mut entry = vacant.insert(Entry::new(init(), None));
                f(&mut entry.value)
            }
        }
    }

    fn matching_keys(&self, pattern: &str) -> Vec<String> {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|e| !e.is_expired(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect()
    }
}

#[async_trait]
impl CacheTransport for MemoryTransport {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.read(key, |value| match value {
            Value::Str(s) => Ok(s.clone()),
            other => Err(wrong_type(key, "string", other)),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        self.ensure_capacity(key)?;
        self.entries
            .insert(key.to_string(), Entry::new(Value::Str(value.to_string()), ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.read(key, |_| Ok(())).map(|found| found.is_some())
    }

    async fn hash_incr(&self, key: &str, field: &str, delta: i64) -> Result<i64, CacheError> {
        self.upsert(
            key,
            || Value::Hash(HashMap::new()),
            |value| match value {
                Value::Hash(fields) => {
                    let slot = fields.entry(field.to_string()).or_insert(0);
                    *slot += delta;
                    Ok(*slot)
                }
                other => Err(wrong_type(key, "hash", other)),
            },
        )
    }

    async fn hash_set_all(&self, key: &str, fields: &[(&str, i64)]) -> Result<(), CacheError> {
        self.upsert(
            key,
            || Value::Hash(HashMap::new()),
            |value| match value {
                Value::Hash(existing) => {
                    for (field, v) in fields {
                        existing.insert((*field).to_string(), *v);
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            },
        )
    }

    async fn hash_set_if_absent(
        &self,
        key: &str,
        fields: &[(&str, i64)],
    ) -> Result<(), CacheError> {
        self.upsert(
            key,
            || Value::Hash(HashMap::new()),
            |value| match value {
                Value::Hash(existing) => {
                    for (field, v) in fields {
                        existing.entry((*field).to_string()).or_insert(*v);
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            },
        )
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, i64>, CacheError> {
        self.read(key, |value| match value {
            Value::Hash(fields) => Ok(fields.clone()),
            other => Err(wrong_type(key, "hash", other)),
        })
        .map(Option::unwrap_or_default)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.upsert(
            key,
            || Value::Set(HashSet::new()),
            |value| match value {
                Value::Set(members) => {
                    members.insert(member.to_string());
                    Ok(())
                }
                other => Err(wrong_type(key, "set", other)),
            },
        )
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), CacheError> {
        let now = Instant::now();
        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_expired(now) {
                return Ok(());
            }
            match &mut entry.value {
                Value::Set(members) => {
                    members.remove(member);
                }
                other => return Err(wrong_type(key, "set", other)),
            }
        }
        // Redis drops a set once its last member is gone
        self.entries.remove_if(key, |_, entry| {
            matches!(&entry.value, Value::Set(members) if members.is_empty())
        });
        Ok(())
    }

    async fn set_is_member(&self, key: &str, member: &str) -> Result<bool, CacheError> {
        self.read(key, |value| match value {
            Value::Set(members) => Ok(members.contains(member)),
            other => Err(wrong_type(key, "set", other)),
        })
        .map(|found| found.unwrap_or(false))
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.read(key, |value| match value {
            Value::Set(members) => Ok(members.iter().cloned().collect()),
            other => Err(wrong_type(key, "set", other)),
        })
        .map(Option::unwrap_or_default)
    }

    async fn set_replace(&self, key: &str, members: &[String]) -> Result<(), CacheError> {
        if members.is_empty() {
            self.entries.remove(key);
            return Ok(());
        }
        self.ensure_capacity(key)?;
        let members: HashSet<String> = members.iter().cloned().collect();
        self.entries.insert(key.to_string(), Entry::new(Value::Set(members), None));
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.matching_keys(pattern))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut removed = 0;
        for key in self.matching_keys(pattern) {
            if self.entries.remove(&key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn count_keys(&self, pattern: &str) -> Result<u64, CacheError> {
        Ok(self.matching_keys(pattern).len() as u64)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.clear();
        Ok(())
    }
}

/// Redis-style glob match supporting `*` and `?`.
pub(crate) fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}
