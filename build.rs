//! Build script for generating the `nexstor` man pages.
//!
//! Packaging picks the pages up from the build output directory: one for
//! `nexstor` itself and one per subcommand (`nexstor-provision.1`, ...).

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(man: &Man, out_dir: &Path, title: &str) -> std::io::Result<()> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    File::create(out_dir.join(format!("{title}.1")))?.write_all(&buffer)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir =
        PathBuf::from(env::var_os("OUT_DIR").ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "OUT_DIR was not set")
        })?);

    let command = Cli::command();
    for subcommand in command.get_subcommands() {
        let title = format!("nexstor-{}", subcommand.get_name());
        render(
            &Man::new(subcommand.clone()).title(title.clone()),
            &out_dir,
            &title,
        )?;
    }
    render(&Man::new(command), &out_dir, "nexstor")?;

    Ok(())
}
