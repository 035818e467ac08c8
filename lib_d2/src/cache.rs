use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use log::debug;

use crate::color::{Palette, SourceBitmap};
use crate::settings::TextureSettings;

/// Hash of everything a cached derivative depends on.
pub type Fingerprint = u64;

/// Covers source pixels and dimensions, target format, palette and offset
/// (plus the remaining conversion settings).
pub fn fingerprint(
    source: &SourceBitmap,
    settings: &TextureSettings,
    palette: Option<&Palette>,
) -> Fingerprint {
    let mut hasher = DefaultHasher::new();
    source.width().hash(&mut hasher);
    source.height().hash(&mut hasher);
    source.rgba().hash(&mut hasher);
    settings.hash(&mut hasher);
    palette.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Default)]
struct CacheEntry {
    fingerprint: Fingerprint,
    binary: Option<Vec<u8>>,
    preview: Option<Vec<u8>>,
}

/// Derived artifacts (encoded D2 bytes, RGBA previews) per texture.
///
/// Every read re-validates the stored fingerprint against the caller's
/// current one; a mismatch drops the whole entry.
#[derive(Debug)]
pub struct TextureCache<K> {
    entries: HashMap<K, CacheEntry>,
}

impl<K> Default for TextureCache<K> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TextureCache<K> {
    pub fn new() -> Self {
        Self::default()
    }

    fn validated(&mut self, key: &K, fingerprint: Fingerprint) -> Option<&CacheEntry> {
        let stale = self.entries.get(key)?.fingerprint != fingerprint;
        if stale {
            debug!("Dropping stale texture cache entry");
            self.entries.remove(key);
            return None;
        }
        self.entries.get(key)
    }

    fn entry_for(&mut self, key: K, fingerprint: Fingerprint) -> &mut CacheEntry {
        let entry = self.entries.entry(key).or_default();
        if entry.fingerprint != fingerprint {
            *entry = CacheEntry {
                fingerprint,
                ..CacheEntry::default()
            };
        }
        entry
    }

    pub fn binary(&mut self, key: &K, fingerprint: Fingerprint) -> Option<&[u8]> {
        self.validated(key, fingerprint)?.binary.as_deref()
    }

    pub fn preview(&mut self, key: &K, fingerprint: Fingerprint) -> Option<&[u8]> {
        self.validated(key, fingerprint)?.preview.as_deref()
    }

    pub fn store_binary(&mut self, key: K, fingerprint: Fingerprint, binary: Vec<u8>) {
        self.entry_for(key, fingerprint).binary = Some(binary);
    }

    pub fn store_preview(&mut self, key: K, fingerprint: Fingerprint, preview: Vec<u8>) {
        self.entry_for(key, fingerprint).preview = Some(preview);
    }

    pub fn invalidate(&mut self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
