use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_DIR_NAME: &str = "CTRs";
pub const BUCKET_CONFIG_FILE_NAME: &str = "s3bucket.json";

static LOCATION_URI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.-]*)://(?P<bucket>[^/]*)(?:/(?P<prefix>.*))?$")
        .expect("location regex must compile")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    pub home_dir: PathBuf,
    pub cwd: PathBuf,
    pub data_dir: PathBuf,
    pub store_root: PathBuf,
}

pub fn resolve_runtime_paths(
    home_dir: &Path,
    cwd: &Path,
    data_dir_override: Option<&Path>,
    store_root_override: Option<&Path>,
) -> Result<RuntimePaths> {
    if !home_dir.is_absolute() {
        bail!("home_dir must be absolute: {}", home_dir.display());
    }
    if !cwd.is_absolute() {
        bail!("cwd must be absolute: {}", cwd.display());
    }

    let home_dir = normalize_lexical(home_dir);
    let cwd = normalize_lexical(cwd);
    let data_dir = match data_dir_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => cwd.join(DEFAULT_DATA_DIR_NAME),
    };
    let store_root = match store_root_override {
        Some(path) => resolve_user_path(path, &home_dir, &cwd)?,
        None => cwd.clone(),
    };

    Ok(RuntimePaths {
        home_dir,
        cwd,
        data_dir: normalize_lexical(&data_dir),
        store_root: normalize_lexical(&store_root),
    })
}

impl RuntimePaths {
    #[must_use]
    pub fn bucket_dir(&self, bucket: &str) -> PathBuf {
        let bucket_path = Path::new(bucket);
        if bucket_path.is_absolute() {
            normalize_lexical(bucket_path)
        } else {
            normalize_lexical(&self.store_root.join(bucket_path))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceLocation {
    pub bucket: String,
    pub prefix: String,
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            bail!("source location is empty");
        }

        let Some(captures) = LOCATION_URI.captures(raw) else {
            return Ok(Self {
                bucket: raw.to_string(),
                prefix: String::new(),
            });
        };

        let bucket = captures
            .name("bucket")
            .map_or("", |matched| matched.as_str());
        if bucket.is_empty() {
            bail!("source location has no bucket: {raw}");
        }
        let prefix = captures
            .name("prefix")
            .map_or("", |matched| matched.as_str());

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BucketConfig {
    #[serde(rename = "BucketName")]
    pub bucket_name: String,
}

pub fn load_bucket_config(path: &Path) -> Result<Option<BucketConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bucket config: {}", path.display()))?;
    let config = serde_json::from_str::<BucketConfig>(&content)
        .with_context(|| format!("invalid bucket config: {}", path.display()))?;
    Ok(Some(config))
}

#[must_use]
pub fn bucket_config_path(cwd: &Path) -> PathBuf {
    cwd.join(BUCKET_CONFIG_FILE_NAME)
}

fn resolve_user_path(path: &Path, home_dir: &Path, cwd: &Path) -> Result<PathBuf> {
    let expanded = expand_tilde(path, home_dir)?;
    let resolved = if expanded.is_absolute() {
        expanded
    } else {
        cwd.join(expanded)
    };

    Ok(normalize_lexical(&resolved))
}

fn expand_tilde(path: &Path, home_dir: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let mut expanded = home_dir.to_path_buf();
            for component in components {
                expanded.push(component.as_os_str());
            }
            Ok(expanded)
        }
        Some(Component::Normal(first))
            if first
                .to_str()
                .is_some_and(|segment| segment.starts_with('~')) =>
        {
            bail!(
                "unsupported home expansion syntax (only `~` and `~/...` are supported): {}",
                path.display()
            )
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn normalize_lexical(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component.as_os_str());
                }
            }
            _ => normalized.push(component.as_os_str()),
        }
    }

    normalized
}
