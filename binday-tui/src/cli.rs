use std::path::PathBuf;

use anyhow::{Context, Result};
use binday_core::config::BindayConfig;
use clap::{Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::Serialize;

const DEFAULT_CONFIG_FILE: &str = "binday.toml";
const ENV_PREFIX: &str = "BINDAY_";

/// Track Canterbury bin collections from the terminal.
#[derive(Debug, Parser)]
#[command(name = "binday", version, about)]
pub(crate) struct Args {
    /// TOML file with settings (defaults to ./binday.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Unique property reference number
    #[arg(long, global = true)]
    pub uprn: Option<String>,

    /// Unique street reference number
    #[arg(long, global = true)]
    pub usrn: Option<String>,

    /// Where `watch` writes its log
    #[arg(long, global = true, default_value = "binday.log")]
    pub log_file: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Default, Subcommand)]
pub(crate) enum Command {
    /// Keep refreshing and show every entity in a dashboard
    #[default]
    Watch,
    /// Fetch once and print the raw response, normalized result, and entity states
    Dump,
}

/// Flags that override file and environment settings.
#[derive(Debug, Serialize)]
struct Overrides<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    uprn: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    usrn: Option<&'a str>,
}

/// Layer defaults, the TOML file, `BINDAY_*` variables, and flags, in that order.
pub(crate) fn load_config(args: &Args) -> Result<BindayConfig> {
    let file = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    Figment::new()
        .merge(Toml::file(&file))
        .merge(Env::prefixed(ENV_PREFIX))
        .merge(Serialized::defaults(Overrides {
            uprn: args.uprn.as_deref(),
            usrn: args.usrn.as_deref(),
        }))
        .extract()
        .with_context(|| format!("Failed to load config (file: {})", file.display()))
}
