use lean_dashboard::{cookies::CookieJar, Settings};
use log::info;

#[derive(Clone, Debug, clap::Parser)]
pub struct LogoutCommand;

impl LogoutCommand {
    pub fn exec(self, settings: &Settings) -> anyhow::Result<()> {
        let jar = CookieJar::open(settings.cookie_path())?;
        jar.remove_file()?;
        info!("Removed {:?}", jar.path());
        Ok(())
    }
}
