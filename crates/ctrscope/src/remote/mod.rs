use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

pub const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    pub next_continuation: Option<String>,
}

/// Listing is lexicographic by key; `continuation` is the last key of the
/// previous page.
pub trait ObjectStore {
    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ObjectPage>;

    fn get_object(&self, key: &str) -> Result<Vec<u8>>;
}

pub fn list_all_keys(store: &dyn ObjectStore, prefix: &str) -> Result<Vec<String>> {
    let mut keys = Vec::new();
    let mut continuation: Option<String> = None;

    loop {
        let page = store
            .list_page(prefix, continuation.as_deref())
            .with_context(|| format!("failed to list objects under prefix `{prefix}`"))?;
        keys.extend(page.keys);
        match page.next_continuation {
            Some(next) if continuation.as_deref() != Some(next.as_str()) => {
                continuation = Some(next);
            }
            Some(next) => bail!("object listing did not advance past `{next}`"),
            None => break,
        }
    }

    Ok(keys)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryObjectStore {
    root: PathBuf,
    keys: Vec<String>,
    page_size: usize,
}

impl DirectoryObjectStore {
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            bail!("bucket directory not found: {}", root.display());
        }
        Ok(Self {
            root: root.to_path_buf(),
            keys: sorted_relative_keys(root)?,
            page_size: DEFAULT_PAGE_SIZE,
        })
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

impl ObjectStore for DirectoryObjectStore {
    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ObjectPage> {
        Ok(paginate(
            self.keys.iter().map(String::as_str),
            prefix,
            continuation,
            self.page_size,
        ))
    }

    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        if key.split('/').any(|segment| segment == "..") {
            bail!("object key escapes bucket root: {key}");
        }
        let path = self.root.join(key);
        std::fs::read(&path).with_context(|| format!("failed to read object: {}", path.display()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryObjectStore {
    objects: BTreeMap<String, Vec<u8>>,
    page_size: usize,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, payload: impl Into<Vec<u8>>) {
        self.objects.insert(key.into(), payload.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        self.objects.remove(key)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn list_page(&self, prefix: &str, continuation: Option<&str>) -> Result<ObjectPage> {
        Ok(paginate(
            self.objects.keys().map(String::as_str),
            prefix,
            continuation,
            self.page_size.max(1),
        ))
    }

    fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .get(key)
            .cloned()
            .with_context(|| format!("no such object: {key}"))
    }
}

fn paginate<'a>(
    sorted_keys: impl Iterator<Item = &'a str>,
    prefix: &str,
    continuation: Option<&str>,
    page_size: usize,
) -> ObjectPage {
    let mut matching = sorted_keys
        .filter(|key| key.starts_with(prefix))
        .filter(|key| continuation.is_none_or(|after| *key > after));

    let keys = matching
        .by_ref()
        .take(page_size)
        .map(str::to_string)
        .collect::<Vec<_>>();
    let next_continuation = if matching.next().is_some() {
        keys.last().cloned()
    } else {
        None
    };

    ObjectPage {
        keys,
        next_continuation,
    }
}

fn sorted_relative_keys(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    collect_dir_files(root, &mut files)?;
    let mut keys = files
        .iter()
        .filter_map(|path| path.strip_prefix(root).ok())
        .map(|relative| {
            relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .collect::<Vec<_>>();
    keys.sort();
    Ok(keys)
}

fn collect_dir_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read bucket directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to enumerate bucket directory: {}", dir.display()))?;
    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .with_context(|| format!("failed to stat bucket entry: {}", path.display()))?;
        if file_type.is_dir() {
            collect_dir_files(&path, out)?;
        } else if file_type.is_file() {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{DirectoryObjectStore, MemoryObjectStore, ObjectStore, list_all_keys};

    #[test]
    fn pages_resume_after_continuation_key() {
        let mut store = MemoryObjectStore::new().with_page_size(2);
        for key in ["ctr/a.csv", "ctr/b.csv", "ctr/c.csv", "other/d.csv"] {
            store.insert(key, b"x".to_vec());
        }

        let first = store.list_page("ctr/", None).expect("first page");
        assert_eq!(first.keys, ["ctr/a.csv", "ctr/b.csv"]);
        assert_eq!(first.next_continuation.as_deref(), Some("ctr/b.csv"));

        let second = store
            .list_page("ctr/", first.next_continuation.as_deref())
            .expect("second page");
        assert_eq!(second.keys, ["ctr/c.csv"]);
        assert!(second.next_continuation.is_none());

        let all = list_all_keys(&store, "ctr/").expect("all pages");
        assert_eq!(all, ["ctr/a.csv", "ctr/b.csv", "ctr/c.csv"]);
    }

    #[test]
    fn directory_store_pages_from_one_walk() {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be after unix epoch")
            .as_nanos();
        let root = std::env::temp_dir().join(format!("ctrscope-remote-walk-{nanos}"));
        std::fs::create_dir_all(root.join("ctr").join("03")).expect("bucket should be creatable");
        for key in ["ctr/03/b.csv", "ctr/a.csv", "ctr/c.csv"] {
            std::fs::write(root.join(key), "x").expect("object should be writable");
        }

        let store = DirectoryObjectStore::open(&root)
            .expect("bucket should open")
            .with_page_size(1);
        std::fs::write(root.join("ctr").join("late.csv"), "x").expect("object should be writable");

        let all = list_all_keys(&store, "ctr/").expect("all pages");
        assert_eq!(all, ["ctr/03/b.csv", "ctr/a.csv", "ctr/c.csv"]);
        assert_eq!(store.get_object("ctr/late.csv").expect("fetch reads disk"), b"x");
    }
}
