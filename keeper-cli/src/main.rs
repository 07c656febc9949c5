// Command-line interface for keeper
//
// This binary converts knowledge-base exports between the Notion markdown
// export, the LegendKeeper JSON export and the LegendKeeper markdown tree, and
// tests how well content survives a chain of such conversions.
//
// Usage:
//  keeper convert <input> --to <format> [--from <format>] -o <dir>   - Convert one export
//  keeper roundtrip <source> <chain> [--report [<path>]]            - Run a chain and diff the ends
//  keeper inspect <input> [--from <format>]                          - Print the resource tree
//  keeper --list-formats                                             - List available formats
//
// Extra Parameters:
//
// Settings can be overridden with --extra-<name> <value>. The CLI strips the
// "extra-" prefix and applies the known keys to the loaded configuration:
//  keeper convert Export.json --to lk-json -o out --extra-schema-version 2

mod inspect;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use keeper_babel::chain::{check_source, run_chain, Chain, ChainOptions};
use keeper_babel::formats::lk_json::LkJsonFormat;
use keeper_babel::{Format, FormatRegistry, Severity, Warning};
use keeper_config::{KeeperConfig, Loader};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Parse extra-* arguments from command line args
/// Returns (cleaned_args_without_extras, extra_params_map)
///
/// Supports both:
/// - `--extra-<key> <value>` (explicit value)
/// - `--extra-<key>` (boolean flag, defaults to "true")
/// - `--extras-<key>` (alias for `--extra-<key>`)
fn parse_extra_args(args: &[String]) -> (Vec<String>, HashMap<String, String>) {
    let mut cleaned_args = Vec::new();
    let mut extra_params = HashMap::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];

        let key_opt = if let Some(key) = arg.strip_prefix("--extra-") {
            Some(key)
        } else {
            arg.strip_prefix("--extras-")
        };

        if let Some(key) = key_opt {
            let has_value = i + 1 < args.len() && !args[i + 1].starts_with('-');
            if has_value {
                extra_params.insert(key.to_string(), args[i + 1].clone());
                i += 2;
            } else {
                extra_params.insert(key.to_string(), "true".to_string());
                i += 1;
            }
            continue;
        }

        cleaned_args.push(arg.clone());
        i += 1;
    }

    (cleaned_args, extra_params)
}

fn build_cli() -> Command {
    Command::new("keeper")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert and round-trip test knowledge-base exports")
        .long_about(
            "keeper converts between knowledge-base export formats and checks what\n\
            survives a chain of conversions.\n\n\
            Commands:\n  \
            - convert:   Convert one export into another format\n  \
            - roundtrip: Run a chain of conversions and compare both ends\n  \
            - inspect:   Print the resource tree and table summaries\n\n\
            Extra Parameters:\n  \
            Use --extra-<name> [value] to override configuration values.\n  \
            Boolean flags can omit the value (defaults to 'true').\n  \
            Known names: schema-version, pretty, keep-intermediates, work-dir,\n  \
            report-dir.\n\n\
            Examples:\n  \
            keeper convert Export-abc --to lk-json -o out\n  \
            keeper roundtrip Export-abc 'notion->lk-json->notion'\n  \
            keeper roundtrip world.json 'lk-json->lk-md->lk-json' --report\n  \
            keeper inspect world.json",
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
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
                .help("Path to a keeper.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Log more (-v info, -vv debug, -vvv trace)")
                .action(ArgAction::Count)
                .global(true),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only log errors")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert an export into another format")
                .long_about(
                    "Parse an export and write it in another format.\n\n\
                    Formats:\n  \
                    - notion:  Notion markdown export (folder of 'Name <id>.md' files)\n  \
                    - lk-json: LegendKeeper JSON export (single .json file)\n  \
                    - lk-md:   LegendKeeper markdown tree (folder with frontmatter)\n\n\
                    The source format is detected from the input unless --from is given.\n\
                    Warnings about content that could not be carried over go to stderr.\n\n\
                    Examples:\n  \
                    keeper convert Export-abc --to lk-json -o out\n  \
                    keeper convert world.json --to lk-md -o tree --from lk-json",
                )
                .arg(
                    Arg::new("input")
                        .help("Export file or directory")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (detected from the input if not specified)")
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Directory to write the export into (required)")
                        .required(true)
                        .value_hint(ValueHint::DirPath),
                ),
        )
        .subcommand(
            Command::new("roundtrip")
                .about("Run a conversion chain and compare the first and last snapshot")
                .long_about(
                    "Parse the source, export and re-parse it once per hop, then compare\n\
                    the original snapshot with the final one.\n\n\
                    The chain is written as formats joined by '->' and must start with\n\
                    the format of the source.\n\n\
                    The exit code is 0 for a perfect match and 1 otherwise.\n\n\
                    Examples:\n  \
                    keeper roundtrip Export-abc 'notion->lk-json->notion'\n  \
                    keeper roundtrip world.json 'lk-json->notion->lk-json' --report\n  \
                    keeper roundtrip world.json 'lk-json->lk-md->lk-json' --report out.txt",
                )
                .arg(
                    Arg::new("source")
                        .help("Source export file or directory")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("chain")
                        .help("Conversion chain, e.g. 'notion->lk-json->notion'")
                        .required(true)
                        .index(2)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .value_name("PATH")
                        .help("Also write the report to a file")
                        .long_help(
                            "Write the report to a file as well as stdout.\n\n\
                            Without a value, or with a directory, the file is named\n\
                            report_<YYYYmmdd_HHMMSS>.txt and placed in report.directory\n\
                            or the given directory.",
                        )
                        .num_args(0..=1)
                        .default_missing_value("")
                        .value_hint(ValueHint::AnyPath),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print the resource tree and table summaries of an export")
                .arg(
                    Arg::new("input")
                        .help("Export file or directory")
                        .required(true)
                        .index(1)
                        .value_hint(ValueHint::AnyPath),
                )
                .arg(
                    Arg::new("from")
                        .long("from")
                        .help("Source format (detected from the input if not specified)")
                        .value_hint(ValueHint::Other),
                ),
        )
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let (cleaned_args, mut extra_params) = parse_extra_args(&args);

    let matches = build_cli()
        .try_get_matches_from(&cleaned_args)
        .unwrap_or_else(|e| e.exit());

    // Global flags are propagated down, so the innermost matches see them all.
    let globals = matches.subcommand().map(|(_, m)| m).unwrap_or(&matches);

    if globals.get_flag("list-formats") {
        handle_list_formats_command();
        return;
    }

    let mut config = load_cli_config(globals.get_one::<String>("config").map(|s| s.as_str()));
    apply_config_overrides(&mut config, &mut extra_params);
    init_logging(&config, globals.get_count("verbose"), globals.get_flag("quiet"));

    if !extra_params.is_empty() {
        let mut unknown: Vec<_> = extra_params.keys().map(|k| format!("--extra-{k}")).collect();
        unknown.sort();
        eprintln!("Unknown extra parameters: {}", unknown.join(", "));
        std::process::exit(1);
    }

    match matches.subcommand() {
        Some(("convert", sub_matches)) => {
            let input = required(sub_matches, "input");
            let to = required(sub_matches, "to");
            let output = required(sub_matches, "output");
            let from = sub_matches.get_one::<String>("from").map(|s| s.as_str());
            handle_convert_command(Path::new(input), from, to, Path::new(output), &config);
        }
        Some(("roundtrip", sub_matches)) => {
            let source = required(sub_matches, "source");
            let chain = required(sub_matches, "chain");
            let report = sub_matches
                .get_one::<String>("report")
                .map(|raw| (!raw.is_empty()).then(|| PathBuf::from(raw)));
            handle_roundtrip_command(Path::new(source), chain, report, &config);
        }
        Some(("inspect", sub_matches)) => {
            let input = required(sub_matches, "input");
            let from = sub_matches.get_one::<String>("from").map(|s| s.as_str());
            handle_inspect_command(Path::new(input), from, &config);
        }
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    match matches.get_one::<String>(id) {
        Some(value) => value,
        None => {
            eprintln!("Missing required argument '{id}'");
            std::process::exit(1);
        }
    }
}

/// Install the stderr subscriber. `-v`/`-q` win over `RUST_LOG`, which wins
/// over `logging.filter`.
fn init_logging(config: &KeeperConfig, verbosity: u8, quiet: bool) {
    let directive = if quiet {
        Some("error")
    } else {
        match verbosity {
            0 => None,
            1 => Some("info"),
            2 => Some("debug"),
            _ => Some("trace"),
        }
    };
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Registry whose lk-json exporter follows the loaded configuration.
fn registry_from_config(config: &KeeperConfig) -> FormatRegistry {
    let options = config.export.lk_json.export_options().unwrap_or_else(|err| {
        eprintln!("Invalid configuration: {err}");
        std::process::exit(1);
    });
    let mut registry = FormatRegistry::default();
    registry.register(LkJsonFormat::new(options));
    registry
}

fn resolve_format(registry: &FormatRegistry, input: &Path, explicit: Option<&str>) -> String {
    if let Some(format) = explicit {
        return format.to_string();
    }
    match registry.detect_format_from_path(input) {
        Some(detected) => detected,
        None => {
            eprintln!("Error: Could not detect the format of '{}'", input.display());
            eprintln!("Please specify --from explicitly");
            std::process::exit(1);
        }
    }
}

fn print_warnings(origin: &str, warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    eprintln!("{} warning(s) during {origin}:", warnings.len());
    for warning in warnings {
        eprintln!("  {warning}");
    }
}

/// Handle the convert command
fn handle_convert_command(input: &Path, from: Option<&str>, to: &str, output: &Path, config: &KeeperConfig) {
    let registry = registry_from_config(config);
    let from = resolve_format(&registry, input, from);

    let parsed = registry.parse(input, &from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let (data, parse_warnings) = parsed.into_parts();
    print_warnings("parse", &parse_warnings);

    let exported = registry.export(&data, output, to).unwrap_or_else(|e| {
        eprintln!("Export error: {e}");
        std::process::exit(1);
    });
    let (written, export_warnings) = exported.into_parts();
    print_warnings("export", &export_warnings);

    println!(
        "Converted {} resource(s) from {from} to {to}: {}",
        data.len(),
        written.display()
    );
}

/// Handle the roundtrip command
///
/// `report` is `None` without `--report`, `Some(None)` for a bare `--report`.
fn handle_roundtrip_command(source: &Path, chain: &str, report: Option<Option<PathBuf>>, config: &KeeperConfig) {
    let registry = registry_from_config(config);
    let chain: Chain = chain.parse().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    if let Err(e) = check_source(&registry, source, &chain) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let options = ChainOptions::from(&config.chain);
    let run = run_chain(&registry, source, &chain, &options).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });
    if options.keep_intermediates || options.work_dir.is_some() {
        eprintln!("Intermediate exports kept in {}", run.work_dir().display());
    }

    let diff = run.diff();
    let text = diff.to_string();
    println!("{text}");

    let target = match report {
        Some(path) => Some(path),
        None if config.report.write_file => Some(None),
        None => None,
    };
    if let Some(path) = target {
        let path = report_path(path, &config.report.directory);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating '{}': {e}", parent.display());
                std::process::exit(1);
            }
        }
        if let Err(e) = fs::write(&path, format!("{text}\n")) {
            eprintln!("Error writing report '{}': {e}", path.display());
            std::process::exit(1);
        }
        eprintln!("Report written to {}", path.display());
    }

    if diff.verdict() != Severity::Perfect {
        std::process::exit(1);
    }
}

/// A file path is used as is; a directory, or nothing, gets a timestamped
/// report name.
fn report_path(explicit: Option<PathBuf>, default_dir: &Path) -> PathBuf {
    let name = format!("report_{}.txt", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    match explicit {
        Some(path) if path.is_dir() => path.join(name),
        Some(path) => path,
        None => default_dir.join(name),
    }
}

/// Handle the inspect command
fn handle_inspect_command(input: &Path, from: Option<&str>, config: &KeeperConfig) {
    let registry = registry_from_config(config);
    let from = resolve_format(&registry, input, from);
    let parsed = registry.parse(input, &from).unwrap_or_else(|e| {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    });
    let (data, warnings) = parsed.into_parts();
    print!("{}", inspect::render(&data));
    print_warnings("parse", &warnings);
}

/// Handle the list-formats command
fn handle_list_formats_command() {
    let registry = FormatRegistry::default();
    println!("Available formats:\n");
    for name in registry.list_formats() {
        let description = registry
            .get(&name)
            .map(|format: &dyn Format| format.description().to_string())
            .unwrap_or_default();
        println!("  {name:<8} {description}");
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> KeeperConfig {
    let loader = Loader::new().with_optional_file("keeper.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn apply_config_overrides(config: &mut KeeperConfig, extra_params: &mut HashMap<String, String>) {
    if let Some(raw) = take_override(extra_params, &["schema-version", "schema_version"]) {
        config.export.lk_json.schema_version = raw.parse().unwrap_or_else(|_| {
            eprintln!("Invalid schema version '{raw}' for --extra-schema-version");
            std::process::exit(1);
        });
    }
    if let Some(raw) = take_override(extra_params, &["pretty"]) {
        config.export.lk_json.pretty = parse_bool_arg("pretty", &raw);
    }
    if let Some(raw) = take_override(extra_params, &["keep-intermediates", "keep"]) {
        config.chain.keep_intermediates = parse_bool_arg("keep-intermediates", &raw);
    }
    if let Some(path) = take_override(extra_params, &["work-dir", "work_dir"]) {
        config.chain.work_dir = Some(PathBuf::from(path));
    }
    if let Some(path) = take_override(extra_params, &["report-dir"]) {
        config.report.directory = PathBuf::from(path);
    }
}

fn take_override(map: &mut HashMap<String, String>, keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Some(value) = map.remove(*key) {
            return Some(value);
        }
    }
    None
}

fn parse_bool_arg(flag: &str, raw: &str) -> bool {
    match raw.to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        other => {
            eprintln!("Invalid boolean value '{other}' for --extra-{flag}");
            std::process::exit(1);
        }
    }
}
