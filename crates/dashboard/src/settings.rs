use std::{env, path::PathBuf};

use log::debug;

use crate::FatalError;

/// Overrides the region based origin of every client when set to a non-empty value.
pub const DASHBOARD_ENV: &str = "LEANCLOUD_DASHBOARD";

const DATA_DIR_NAME: &str = "leancloud";
const COOKIE_FILE_NAME: &str = "cookies";
const APP_REGIONS_FILE_NAME: &str = "app_regions.json";

/// Process wide configuration, read once at startup and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Settings {
    dashboard: Option<String>,
    config_dir: PathBuf,
}

impl Settings {
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            dashboard: None,
            config_dir: config_dir.into(),
        }
    }

    pub fn from_env() -> Result<Self, FatalError> {
        let config_dir = dirs::config_dir().ok_or(FatalError::ConfigDir)?;
        let dashboard = env::var(DASHBOARD_ENV).ok();
        if let Some(dashboard) = dashboard.as_deref() {
            debug!("Using dashboard {dashboard:?} from {DASHBOARD_ENV}");
        }
        Ok(Self::new(config_dir).with_dashboard(dashboard))
    }

    pub fn with_dashboard(mut self, dashboard: Option<String>) -> Self {
        self.dashboard = dashboard.filter(|d| !d.is_empty());
        self
    }

    pub fn dashboard(&self) -> Option<&str> {
        self.dashboard.as_deref()
    }

    pub fn data_dir(&self) -> PathBuf {
        self.config_dir.join(DATA_DIR_NAME)
    }

    pub fn cookie_path(&self) -> PathBuf {
        self.data_dir().join(COOKIE_FILE_NAME)
    }

    pub fn app_regions_path(&self) -> PathBuf {
        self.data_dir().join(APP_REGIONS_FILE_NAME)
    }
}
