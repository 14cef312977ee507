//! Command-line parsing.

use anyhow::{anyhow, bail, Context, Result};
use std::path::PathBuf;

use crate::capture::Coordinates;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init,
    Capture {
        image: PathBuf,
        position: Option<Coordinates>,
    },
    List {
        month: Option<String>,
        day: Option<String>,
        json: bool,
    },
    Show {
        id: i64,
        json: bool,
    },
    Delete {
        id: i64,
    },
    Help,
    Version,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub config_path: Option<PathBuf>,
    pub command: Command,
}

/// Parse arguments, excluding the program name.
pub fn parse_args<I>(args: I) -> Result<Invocation>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut command_name = None;
    let mut positional = Vec::new();
    let mut lat = None;
    let mut lon = None;
    let mut month = None;
    let mut day = None;
    let mut json = false;
    let mut flags: Vec<&'static str> = Vec::new();

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{flag} requires a value"));
        match arg.as_str() {
            "--help" | "-h" => return Ok(Invocation { config_path, command: Command::Help }),
            "--version" | "-V" => return Ok(Invocation { config_path, command: Command::Version }),
            "--config" | "-c" => config_path = Some(PathBuf::from(value("--config")?)),
            "--lat" => {
                lat = Some(value("--lat")?);
                flags.push("--lat");
            }
            "--lon" => {
                lon = Some(value("--lon")?);
                flags.push("--lon");
            }
            "--month" | "-m" => {
                month = Some(value("--month")?);
                flags.push("--month");
            }
            "--day" | "-d" => {
                day = Some(value("--day")?);
                flags.push("--day");
            }
            "--json" => {
                json = true;
                flags.push("--json");
            }
            other if other.starts_with('-') && other.parse::<f64>().is_err() => {
                bail!("Unknown argument: {other}")
            }
            other if command_name.is_none() => command_name = Some(other.to_string()),
            other => positional.push(other.to_string()),
        }
    }

    let command = match command_name.as_deref() {
        None if flags.is_empty() => Command::Help,
        None => bail!("{} requires a command", flags[0]),
        Some("init") => {
            no_positional(&positional, "init")?;
            Command::Init
        }
        Some("capture") => Command::Capture {
            image: PathBuf::from(single(&positional, "capture", "IMAGE")?),
            position: position(lat.as_deref(), lon.as_deref())?,
        },
        Some("list") => {
            no_positional(&positional, "list")?;
            Command::List { month, day, json }
        }
        Some("show") => Command::Show {
            id: parse_id(single(&positional, "show", "ID")?)?,
            json,
        },
        Some("delete") => Command::Delete {
            id: parse_id(single(&positional, "delete", "ID")?)?,
        },
        Some(other) => bail!("Unknown command: {other}"),
    };

    let accepted: &[&str] = match command {
        Command::Capture { .. } => &["--lat", "--lon"],
        Command::List { .. } => &["--month", "--day", "--json"],
        Command::Show { .. } => &["--json"],
        _ => &[],
    };
    if let Some(flag) = flags.iter().find(|f| !accepted.contains(*f)) {
        bail!("{} does not take {flag}", command_name.as_deref().unwrap_or_default());
    }

    Ok(Invocation { config_path, command })
}

fn single<'a>(positional: &'a [String], command: &str, name: &str) -> Result<&'a str> {
    match positional {
        [value] => Ok(value.as_str()),
        [] => bail!("{command} requires {name}"),
        _ => bail!("{command} takes a single {name}"),
    }
}

fn no_positional(positional: &[String], command: &str) -> Result<()> {
    match positional.first() {
        Some(extra) => bail!("{command} does not take {extra:?}"),
        None => Ok(()),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    raw.parse().with_context(|| format!("{raw:?} is not a photo id"))
}

fn position(lat: Option<&str>, lon: Option<&str>) -> Result<Option<Coordinates>> {
    match (lat, lon) {
        (None, None) => Ok(None),
        (Some(lat), Some(lon)) => Ok(Some(Coordinates {
            latitude: lat.trim().parse().with_context(|| format!("latitude {lat:?} is not a number"))?,
            longitude: lon.trim().parse().with_context(|| format!("longitude {lon:?} is not a number"))?,
        })),
        _ => bail!("--lat and --lon must be given together"),
    }
}

pub fn help_text() -> String {
    format!(
        r#"snapview {} - geotagged photo log

USAGE:
    snapview [OPTIONS] <COMMAND>

COMMANDS:
    init                              Create the gallery database
    capture IMAGE [--lat X --lon Y]   Record a photo with its position and time
    list [--month MM --day DD]        List photos, optionally taken on a day of any year
    show ID                           Show one photo
    delete ID                         Delete a photo record

OPTIONS:
    --config, -c PATH   Path to config file
    --json              Print records as JSON (list, show)
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    SNAPVIEW_CONFIG     Path to config file (overrides default location)
    SNAPVIEW_LOG        Log filter (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/snapview/config.toml"#,
        env!("CARGO_PKG_VERSION")
    )
}
