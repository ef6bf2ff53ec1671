use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Csv,
    Parquet,
    Json,
}

impl SourceFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredObject {
    pub key: String,
    pub file_name: String,
    pub format: SourceFormat,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryPlan {
    pub objects: Vec<DiscoveredObject>,
    pub skipped_keys: Vec<String>,
}

#[must_use]
pub fn detect_format(key: &str) -> Option<SourceFormat> {
    let extension = base_name(key).rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some(SourceFormat::Csv),
        "parquet" => Some(SourceFormat::Parquet),
        "json" => Some(SourceFormat::Json),
        _ => None,
    }
}

#[must_use]
pub fn base_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

#[must_use]
pub fn plan_objects(keys: &[String]) -> DiscoveryPlan {
    let mut plan = DiscoveryPlan::default();
    for key in keys {
        match detect_format(key) {
            Some(format) => plan.objects.push(DiscoveredObject {
                key: key.clone(),
                file_name: base_name(key).to_string(),
                format,
            }),
            None => plan.skipped_keys.push(key.clone()),
        }
    }
    plan
}
