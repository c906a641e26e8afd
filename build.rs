use clap::Shell;
use std::{env, path::PathBuf};

#[path = "src/cli.rs"]
mod cli;

fn main() {
    let mut cli = cli::generate_cli();
    let mut out_dir = PathBuf::from(env::var_os("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let _ = out_dir.pop();
    let _ = out_dir.pop();
    let _ = out_dir.pop();

    cli.gen_completions("mobsf-client", Shell::Bash, &out_dir);
    cli.gen_completions("mobsf-client", Shell::Fish, &out_dir);
    cli.gen_completions("mobsf-client", Shell::Zsh, &out_dir);
    println!("cargo:rerun-if-changed=src/cli.rs");
}
