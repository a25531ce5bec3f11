//! Deployment regions and the dashboard origin each of them is served from.
use std::{
    fmt::{Display, Formatter},
    str::FromStr,
};

use crate::FatalError;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Region {
    Cn,
    Us,
    Tab,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Cn, Region::Us, Region::Tab];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Cn => "cn",
            Region::Us => "us",
            Region::Tab => "tab",
        }
    }

    /// Origin of the dashboard API for this region, without a trailing slash.
    pub fn dashboard_url(&self) -> &'static str {
        match self {
            Region::Cn => "https://leancloud.cn",
            Region::Us => "https://us.leancloud.cn",
            Region::Tab => "https://tab.leancloud.cn",
        }
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}

impl FromStr for Region {
    type Err = FatalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Region::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FatalError::UnknownRegion(s.to_string()))
    }
}
