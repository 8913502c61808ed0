//! Patchman - compose, send and replay HTTP requests from the command line
//!
//! Every subcommand drives the same `AppState` operations an interactive
//! front end would use.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{arg, value_parser, ArgAction, ArgMatches, Command};

use patchman::constants::APP_VERSION;
use patchman::{
    csv_import, AppState, CachePolicy, Config, JsonValue, PresetType, RequestMethod,
};

fn request_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(-X --method <METHOD> "HTTP method: GET, POST, PUT, PATCH or DELETE")
            .value_parser(value_parser!(String))
            .action(ArgAction::Set),
    )
    .arg(
        arg!(-H --header <HEADER> "Request header as KEY:VALUE - repeatable")
            .value_parser(value_parser!(String))
            .action(ArgAction::Append),
    )
    .arg(
        arg!(-d --data <FIELD> "Body field as KEY=VALUE, sent as a string - repeatable")
            .value_parser(value_parser!(String))
            .action(ArgAction::Append),
    )
    .arg(
        arg!(--body <JSON> "Whole request body as a JSON object")
            .value_parser(value_parser!(String))
            .action(ArgAction::Set),
    )
    .arg(
        arg!(-q --query <PARAM> "Query parameter as KEY=VALUE - repeatable")
            .value_parser(value_parser!(String))
            .action(ArgAction::Append),
    )
    .arg(
        arg!(--cache <POLICY> "Cache policy label, e.g. ignore-local-cache")
            .value_parser(value_parser!(String))
            .action(ArgAction::Set),
    )
}

fn bulk_source_args(cmd: Command) -> Command {
    cmd.arg(
        arg!(--csv <FILE> "CSV file: header row names the fields, one body per row")
            .value_parser(value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
    .arg(
        arg!(--json <FILE> "JSON file holding an array of body objects")
            .value_parser(value_parser!(PathBuf))
            .action(ArgAction::Set),
    )
}

fn cli() -> Command {
    Command::new("patchman")
        .version(APP_VERSION)
        .about("Compose, send and replay HTTP requests")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(request_args(
            Command::new("send")
                .about("send one request and print the response")
                .arg(arg!(<URL> "target URL"))
                .arg(arg!(--"show-headers" "print response headers instead of the body")),
        ))
        .subcommand(bulk_source_args(request_args(
            Command::new("bulk")
                .about("replay one request once per body, in order")
                .arg(arg!(<URL> "target URL")),
        )))
        .subcommand(
            Command::new("preset")
                .about("manage header and body presets")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("list saved presets"))
                .subcommand(
                    Command::new("add")
                        .about("save a preset")
                        .arg(
                            arg!(--kind <KIND> "header or body")
                                .value_parser(["header", "body"])
                                .required(true),
                        )
                        .arg(arg!(--name <NAME> "preset name").required(true))
                        .arg(arg!(--key <KEY> "field name").required(true))
                        .arg(arg!(--value <VALUE> "field value").required(true)),
                ),
        )
        .subcommand(
            Command::new("profile")
                .about("manage saved request profiles")
                .subcommand_required(true)
                .subcommand(Command::new("list").about("list saved profiles"))
                .subcommand(bulk_source_args(request_args(
                    Command::new("save")
                        .about("save a request configuration")
                        .arg(arg!(<NAME> "profile name"))
                        .arg(arg!(<URL> "target URL"))
                        .arg(arg!(--preset <PRESET> "apply a saved preset first - repeatable").action(ArgAction::Append)),
                )))
                .subcommand(
                    Command::new("run")
                        .about("send a saved profile, as a bulk run if it is one")
                        .arg(arg!(<NAME> "profile name")),
                )
                .subcommand(
                    Command::new("export")
                        .about("write a profile to a .patchman file")
                        .arg(arg!(<NAME> "profile name"))
                        .arg(arg!(<PATH> "destination").value_parser(value_parser!(PathBuf))),
                )
                .subcommand(
                    Command::new("import")
                        .about("read a .patchman file and save its profile")
                        .arg(arg!(<PATH> "profile file").value_parser(value_parser!(PathBuf))),
                ),
        )
}

fn main() -> Result<()> {
    let config = Config::from_env();

    // Initialize logging to file
    let _ = std::fs::create_dir_all(&config.data_dir);
    let file_appender = tracing_appender::rolling::never(&config.data_dir, &config.log_file);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();
    let mut state = AppState::new(&config)?;

    match matches.subcommand() {
        Some(("send", m)) => {
            compose(&mut state, m)?;
            send(&mut state, m.get_flag("show-headers"));
        }
        Some(("bulk", m)) => {
            compose(&mut state, m)?;
            load_bulk_source(&mut state, m)?;
            run_bulk(&mut state)?;
        }
        Some(("preset", m)) => preset_command(&mut state, m)?,
        Some(("profile", m)) => profile_command(&mut state, m)?,
        _ => unreachable!("subcommand_required prevents this"),
    }

    Ok(())
}

/// Fill the composer from the shared request arguments
fn compose(state: &mut AppState, m: &ArgMatches) -> Result<()> {
    if let Some(url) = m.get_one::<String>("URL") {
        state.set_url(url.as_str());
    }

    if let Some(name) = m.get_one::<String>("method") {
        state.method =
            RequestMethod::from_name(name).ok_or_else(|| anyhow!("unknown method {}", name))?;
    }

    if let Some(label) = m.get_one::<String>("cache") {
        state.cache_policy = CachePolicy::from_label(label);
    }

    for header in m.get_many::<String>("header").into_iter().flatten() {
        let (key, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header must look like KEY:VALUE, got {}", header))?;
        state.add_header(key.trim(), value.trim());
        state.is_headers_enabled = true;
    }

    if let Some(text) = m.get_one::<String>("body") {
        state.body = JsonValue::object_from_json_text(text).context("--body is not a JSON object")?;
    }

    for field in m.get_many::<String>("data").into_iter().flatten() {
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| anyhow!("body field must look like KEY=VALUE, got {}", field))?;
        state.add_body_field(key.trim(), value);
    }

    for param in m.get_many::<String>("query").into_iter().flatten() {
        let (key, value) = param.split_once('=').unwrap_or((param.as_str(), ""));
        if !state.add_query_param(key, value) {
            bail!("cannot add query parameters to {}", state.url);
        }
    }

    Ok(())
}

fn load_bulk_source(state: &mut AppState, m: &ArgMatches) -> Result<()> {
    if let Some(path) = m.get_one::<PathBuf>("csv") {
        let kept = state.import_bulk_csv(path)?;
        tracing::info!(kept, path = %path.display(), "Loaded bulk bodies from CSV");
    } else if let Some(path) = m.get_one::<PathBuf>("json") {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        state.set_bulk_bodies(csv_import::parse_bulk_json(&text));
    }
    Ok(())
}

fn send(state: &mut AppState, show_headers: bool) {
    state.send_request();
    if show_headers {
        state.toggle_response_headers();
    }
    let time_ms = state.response.as_ref().map(|r| r.time_ms).unwrap_or_default();
    println!("Status: {} ({} ms)", state.status().unwrap_or(-1), time_ms);
    println!("{}", state.response_text());
}

fn run_bulk(state: &mut AppState) -> Result<()> {
    if !state.is_bulk_request {
        bail!("no bulk bodies given; use --csv or --json");
    }
    state.start_bulk()?;
    if let Some(progress) = state.wait_for_bulk() {
        print!("{}", progress.transcript());
    }
    if let Some((succeeded, total)) = state.bulk_summary() {
        println!("{}/{} succeeded", succeeded, total);
    }
    Ok(())
}

fn preset_command(state: &mut AppState, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", _)) => {
            for preset in &state.presets {
                let kind = match preset.preset_type {
                    PresetType::HeaderField => "header",
                    PresetType::BodyField => "body",
                };
                println!("{} [{}] {} = {}", preset.preset_name, kind, preset.key, preset.value);
            }
        }
        Some(("add", m)) => {
            let kind = match m.get_one::<String>("kind").map(String::as_str) {
                Some("body") => PresetType::BodyField,
                _ => PresetType::HeaderField,
            };
            let arg = |name: &str| m.get_one::<String>(name).cloned().unwrap_or_default();
            state.save_preset(kind, &arg("name"), &arg("key"), &arg("value"))?;
            println!("Saved preset {}", arg("name"));
        }
        _ => unreachable!("subcommand_required prevents this"),
    }
    Ok(())
}

fn profile_command(state: &mut AppState, m: &ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", _)) => {
            for profile in &state.profiles {
                let kind = if profile.is_bulk_request {
                    format!("bulk x{}", profile.bulk_request_body.len())
                } else {
                    "single".to_string()
                };
                println!(
                    "{}: {} {} ({})",
                    profile.profile_name,
                    profile.method.as_str(),
                    profile.url,
                    kind
                );
            }
        }
        Some(("save", m)) => {
            for name in m.get_many::<String>("preset").into_iter().flatten() {
                let preset = state
                    .presets
                    .iter()
                    .find(|p| &p.preset_name == name)
                    .cloned()
                    .ok_or_else(|| anyhow!("no preset named {}", name))?;
                state.apply_preset(&preset);
            }
            compose(state, m)?;
            load_bulk_source(state, m)?;
            let name = m.get_one::<String>("NAME").cloned().unwrap_or_default();
            state.save_profile(&name)?;
            println!("Saved profile {}", name);
        }
        Some(("run", m)) => {
            let name = m.get_one::<String>("NAME").cloned().unwrap_or_default();
            if !state.select_profile(&name) {
                bail!("no profile named {}", name);
            }
            if state.is_bulk_request && !state.bulk_bodies.is_empty() {
                run_bulk(state)?;
            } else {
                send(state, false);
            }
        }
        Some(("export", m)) => {
            let name = m.get_one::<String>("NAME").cloned().unwrap_or_default();
            let path = m
                .get_one::<PathBuf>("PATH")
                .ok_or_else(|| anyhow!("missing destination"))?;
            let written = state.export_profile(&name, path)?;
            println!("Wrote {}", written.display());
        }
        Some(("import", m)) => {
            let path = m
                .get_one::<PathBuf>("PATH")
                .ok_or_else(|| anyhow!("missing profile file"))?;
            let profile = state.import_profile(path)?;
            println!("Imported profile {}", profile.profile_name);
        }
        _ => unreachable!("subcommand_required prevents this"),
    }
    Ok(())
}
