use std::marker::PhantomData;

use super::Handle;

/// Slot store addressed by `Handle<K>`.
///
/// `K` defaults to the stored type. Device resource tables store descriptors
/// but hand out handles typed by the resource marker, e.g.
/// `AssetCache<TextureDescriptor, Texture>` yields `Handle<Texture>`.
/// Removed slots are never reused, so a stale handle resolves to `None`.
pub struct AssetCache<T, K = T> {
    items: Vec<Option<T>>,
    live: usize,
    _key: PhantomData<fn() -> K>,
}

impl<T, K> AssetCache<T, K> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            live: 0,
            _key: PhantomData,
        }
    }

    pub fn insert(&mut self, item: T) -> Handle<K> {
        self.items.push(Some(item));
        self.live += 1;
        Handle::new(self.items.len() - 1)
    }

    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let item = self.items.get_mut(handle.index())?.take()?;
        self.live -= 1;
        Some(item)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.items.get(handle.index())?.as_ref()
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| Some((Handle::new(i), item.as_ref()?)))
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T, K> Default for AssetCache<T, K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    enum Texture {}

    #[test]
    fn handles_resolve_in_insertion_order() {
        let mut cache: AssetCache<&str> = AssetCache::new();
        let a = cache.insert("a");
        let b = cache.insert("b");
        assert_eq!(cache.get(a), Some(&"a"));
        assert_eq!(cache.get(b), Some(&"b"));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(Handle::new(7)));
        assert!(cache.get(Handle::new(7)).is_none());
    }

    #[test]
    fn key_type_can_differ_from_stored_type() {
        let mut cache: AssetCache<&str, Texture> = AssetCache::new();
        let handle: Handle<Texture> = cache.insert("albedo");
        assert_eq!(cache.get(handle), Some(&"albedo"));

        let labels: Vec<_> = cache.iter().map(|(h, label)| (h.index(), *label)).collect();
        assert_eq!(labels, vec![(0, "albedo")]);
    }

    #[test]
    fn removed_slots_stay_empty() {
        let mut cache: AssetCache<&str> = AssetCache::new();
        let a = cache.insert("a");
        let b = cache.insert("b");

        assert_eq!(cache.remove(a), Some("a"));
        assert_eq!(cache.remove(a), None);
        assert!(!cache.contains(a));
        assert_eq!(cache.len(), 1);

        let c = cache.insert("c");
        assert_ne!(c, a);
        assert_eq!(cache.get(b), Some(&"b"));
        let live: Vec<_> = cache.iter().map(|(_, item)| *item).collect();
        assert_eq!(live, vec!["b", "c"]);
    }
}
