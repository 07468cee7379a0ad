// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn allow_unstable() -> Arg {
    Arg::new("allow_unstable")
        .short('u')
        .long("allow-unstable")
        .action(ArgAction::SetTrue)
        .help("Allow pre-release versions")
}

fn build_cli() -> Command {
    Command::new("hapm")
        .version(env!("CARGO_PKG_VERSION"))
        .author("HAPM Contributors")
        .about("Home Assistant package manager")
        .subcommand_required(true)
        .arg(
            Arg::new("manifest")
                .short('m')
                .long("manifest")
                .value_name("PATH")
                .default_value("hapm.yaml")
                .global(true)
                .help("Manifest path"),
        )
        .arg(
            Arg::new("storage")
                .short('s')
                .long("storage")
                .value_name("PATH")
                .default_value(".hapm")
                .global(true)
                .help("Storage directory"),
        )
        .arg(
            Arg::new("dry")
                .short('d')
                .long("dry")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Only show what would change"),
        )
        .subcommand(Command::new("init").about("Create an empty manifest"))
        .subcommand(
            Command::new("sync")
                .about("Synchronize storage with the manifest")
                .arg(allow_unstable()),
        )
        .subcommand(
            Command::new("install")
                .about("Add packages to the manifest and synchronize")
                .arg(
                    Arg::new("locations")
                        .required(true)
                        .num_args(1..)
                        .help("Package locations (owner/repo[@version] or GitHub URL)"),
                )
                .arg(
                    Arg::new("type")
                        .short('t')
                        .long("type")
                        .value_parser(["integrations", "plugins"])
                        .help("Kind of the new packages"),
                )
                .arg(allow_unstable()),
        )
        .subcommand(
            Command::new("updates")
                .about("Show packages that have newer versions")
                .arg(allow_unstable()),
        )
        .subcommand(
            Command::new("versions")
                .about("List upstream versions of a package")
                .arg(Arg::new("location").required(true).help("Package location")),
        )
        .subcommand(Command::new("list").about("List installed packages"))
        .subcommand(
            Command::new("export")
                .about("Copy installed packages into a Home Assistant config directory")
                .arg(Arg::new("path").required(true).help("Target directory (emptied first)")),
        )
        .subcommand(
            Command::new("completions")
                .about("Generate shell completion scripts")
                .arg(
                    Arg::new("shell")
                        .required(true)
                        .value_parser(["bash", "elvish", "fish", "powershell", "zsh"])
                        .help("Shell type"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).expect("Failed to render man page");

    let man_path = man_dir.join("hapm.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");
}
