use std::io::{self, Write};

use anyhow::Context;
use lean_dashboard::{Client, Method};
use serde_json::Value;

#[derive(Clone, Debug, clap::Parser)]
pub struct RequestCommand {
    /// Path including the API version, e.g. `/1.1/clients/self`.
    path: String,
    /// JSON document to send as the body.
    #[clap(long)]
    data: Option<String>,
}

impl RequestCommand {
    pub fn exec(self, client: &Client, method: Method) -> anyhow::Result<()> {
        let Self { path, data } = self;
        let params = data
            .map(|d| serde_json::from_str::<Value>(&d))
            .transpose()
            .context("Data is not valid JSON")?;
        let response = client.request(method, &path, params.as_ref(), None)?;
        let mut stdout = io::stdout().lock();
        stdout.write_all(response.body())?;
        if !response.body().ends_with(b"\n") {
            writeln!(stdout)?;
        }
        Ok(())
    }
}
