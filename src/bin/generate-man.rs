// Render the dict2deck man page (and one page per subcommand) into a directory

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_mangen::Man;
use dict2deck::cli::Cli;
use std::path::{Path, PathBuf};

fn render(cmd: &clap::Command, name: &str, out_dir: &Path) -> Result<()> {
    let path = out_dir.join(format!("{}.1", name));
    let mut buffer = Vec::new();
    Man::new(cmd.clone())
        .title(name)
        .render(&mut buffer)
        .with_context(|| format!("Failed to render man page {}", name))?;
    std::fs::write(&path, buffer).with_context(|| format!("Failed to write {}", path.display()))?;
    println!("{}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let cmd = Cli::command();
    render(&cmd, "dict2deck", &out_dir)?;
    for sub in cmd.get_subcommands() {
        render(sub, &format!("dict2deck-{}", sub.get_name()), &out_dir)?;
    }
    Ok(())
}
