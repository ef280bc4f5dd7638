//! Dev-only task runner: generates man pages and shell completions from
//! the `azlin` clap definition so they ship alongside releases without
//! a build-time codegen step.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{generate_to, Shell};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("man") => gen_man(),
        Some("completions") => gen_completions(),
        _ => {
            eprintln!("usage: xtask <man|completions>");
            std::process::exit(2);
        }
    }
}

fn out_dir() -> Result<PathBuf> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../target/xtask");
    fs::create_dir_all(&dir).context("creating xtask output dir")?;
    Ok(dir)
}

fn gen_man() -> Result<()> {
    let cmd = azlin_cli::Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let dir = out_dir()?;
    let path = dir.join("azlin.1");
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    fs::write(&path, buf).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

fn gen_completions() -> Result<()> {
    let dir = out_dir()?;
    let mut cmd = azlin_cli::Cli::command();
    for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
        let path = generate_to(shell, &mut cmd, "azlin", &dir)?;
        println!("wrote {}", path.display());
    }
    Ok(())
}
