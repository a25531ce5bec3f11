//! Mapping from app IDs to the region the app is deployed in.
use std::{
    collections::HashMap,
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context};
use log::debug;

/// Supplies the region identifier of an app.
///
/// The identifier is returned as-is; it is validated against [`crate::Region`] by the client.
pub trait RegionResolver {
    fn region(&self, app_id: &str) -> anyhow::Result<String>;
}

impl<F> RegionResolver for F
where
    F: Fn(&str) -> anyhow::Result<String>,
{
    fn region(&self, app_id: &str) -> anyhow::Result<String> {
        self(app_id)
    }
}

/// Regions of known apps, cached in a JSON object on disk.
#[derive(Clone, Debug, Default)]
pub struct AppRegions {
    path: PathBuf,
    regions: HashMap<String, String>,
}

impl AppRegions {
    /// Read the cache at `path`; a missing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let regions = match fs::read_to_string(&path) {
            Ok(t) => serde_json::from_str(&t)
                .context("Failed to deserialize app regions")
                .with_context(|| format!("Consider removing {path:?}"))?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("{path:?} not found, returning an empty cache");
                HashMap::new()
            }
            Err(e) => return Err(anyhow!(e)),
        };
        Ok(Self { path, regions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn insert(&mut self, app_id: impl Into<String>, region: impl Into<String>) {
        self.regions.insert(app_id.into(), region.into());
    }

    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create the config directory")?;
        }
        let regions =
            serde_json::to_string_pretty(&self.regions).context("Failed to serialize regions")?;
        fs::write(&self.path, regions).context("Failed to write app regions")
    }
}

impl RegionResolver for AppRegions {
    fn region(&self, app_id: &str) -> anyhow::Result<String> {
        self.regions
            .get(app_id)
            .cloned()
            .with_context(|| format!("App {app_id} is not in {:?}", self.path))
    }
}
