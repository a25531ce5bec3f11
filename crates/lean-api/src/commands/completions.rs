use clap_complete::{generate, Shell};

/// Print a completion file for the given shell.
///
/// Covers subcommands and flags; regions, app ids and API paths are completed as free text.
///
/// Example: `lean-api completions zsh | source /dev/stdin`.
#[derive(Clone, Debug, clap::Parser)]
pub struct CompletionsCommand {
    shell: Shell,
}

impl CompletionsCommand {
    pub fn exec<T: clap::CommandFactory>(self) -> anyhow::Result<()> {
        let Self { shell } = self;
        let mut cmd = T::command();
        let bin_name = cmd.get_bin_name().unwrap_or(cmd.get_name()).to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout().lock());
        Ok(())
    }
}
