use super::index::IndexKey;
use super::tuple_list::{EntryRef, TupleList};
use ahash::AHashMap;

/// Items bucketed by composite key. Each bucket is a [`TupleList`]; empty buckets
/// are dropped as soon as their last item is removed.
#[derive(Debug)]
pub struct HashedTupleMemory<T> {
    buckets: AHashMap<IndexKey, TupleList<T>>,
    len: usize,
}

impl<T> Default for HashedTupleMemory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> HashedTupleMemory<T> {
    pub fn new() -> Self {
        Self { buckets: AHashMap::new(), len: 0 }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Insert into the bucket for `key`, creating it if absent
    pub fn add(&mut self, key: IndexKey, item: T) -> EntryRef {
        self.len += 1;
        self.buckets.entry(key).or_default().add(item)
    }

    /// Remove using the key recorded at insertion
    pub fn remove(&mut self, key: &IndexKey, entry: EntryRef) -> Option<T> {
        let bucket = self.buckets.get_mut(key)?;
        let item = bucket.remove(entry)?;
        if bucket.is_empty() {
            self.buckets.remove(key);
        }
        self.len -= 1;
        Some(item)
    }

    /// Items in the bucket for `key`; nothing when no bucket exists
    pub fn iterate_matches<'a>(&'a self, key: &IndexKey) -> impl Iterator<Item = &'a T> + 'a {
        self.buckets.get(key).into_iter().flat_map(TupleList::iter)
    }

    /// Every item, bucket by bucket
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buckets.values().flat_map(TupleList::iter)
    }
}
