use lean_dashboard::{AppRegions, Region, Settings};

#[derive(Clone, Debug, clap::Parser)]
pub struct RememberCommand {
    app_id: String,
    region: Region,
}

impl RememberCommand {
    pub fn exec(self, settings: &Settings) -> anyhow::Result<()> {
        let Self { app_id, region } = self;
        let mut regions = AppRegions::load(settings.app_regions_path())?;
        regions.insert(app_id, region.as_str());
        regions.save()
    }
}
