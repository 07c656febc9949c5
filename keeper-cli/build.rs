use clap::{Arg, ArgAction, Command, ValueHint};
use clap_complete::{generate_to, shells::*};
use std::env;
use std::io::Error;

// Mirror of build_cli() in src/main.rs, without the help texts.
// Build scripts can't access src/ modules.
const AVAILABLE_FORMATS: &[&str] = &["lk-json", "lk-md", "notion"];

fn format_arg(id: &'static str) -> Arg {
    Arg::new(id)
        .long(id)
        .value_parser(clap::builder::PossibleValuesParser::new(AVAILABLE_FORMATS))
        .value_hint(ValueHint::Other)
}

fn main() -> Result<(), Error> {
    let outdir = match env::var_os("OUT_DIR") {
        None => return Ok(()),
        Some(outdir) => outdir,
    };

    let mut cmd = Command::new("keeper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert and round-trip test knowledge-base exports")
        .arg_required_else_help(true)
        .arg(
            Arg::new("list-formats")
                .long("list-formats")
                .help("List available formats")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert an export into another format")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(format_arg("from"))
                .arg(format_arg("to").required(true))
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .required(true)
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Run a conversion chain and compare the first and last snapshot")
                .arg(
                    Arg::new("source")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("chain")
                        .required(true)
                        .index(2)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .num_args(0..=1)
                        .value_hint(ValueHint::AnyPath),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the resource tree and table summaries of an export")
                .arg(
                    Arg::new("input")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(format_arg("from")),
        );

    generate_to(Bash, &mut cmd, "keeper", &outdir)?;
    generate_to(Zsh, &mut cmd, "keeper", &outdir)?;
    generate_to(Fish, &mut cmd, "keeper", &outdir)?;

    println!("cargo:warning=Shell completions generated in {outdir:?}");

    Ok(())
}
