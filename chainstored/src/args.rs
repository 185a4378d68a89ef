use chainstore_history_core::config::{
    params::{HistoryMode, MAINNET_PARAMS, SANDBOX_PARAMS},
    Config,
};
use clap::{arg, Arg, ArgMatches, Command};
use serde::Deserialize;
use std::{ffi::OsString, fs};
use toml::from_str;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Args {
    // NOTE: it is best if property names match config file fields
    pub appdir: Option<String>,
    pub logdir: Option<String>,
    #[serde(rename = "nologfiles")]
    pub no_log_files: bool,
    #[serde(rename = "loglevel")]
    pub log_level: String,
    pub history_mode: HistoryMode,
    /// Use the sandbox chain parameters (tiny cycles) instead of mainnet's
    pub sandbox: bool,
    /// Override of the chain cycle size, for local experimentation
    pub cycle_size: Option<u64>,
    /// Snapshot file to bootstrap from on the first launch
    pub snapshot: Option<String>,
    /// Reconstruct the storage right after the snapshot import
    pub reconstruct: bool,
    pub reset_db: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            appdir: None,
            logdir: None,
            no_log_files: false,
            log_level: "info".to_string(),
            history_mode: HistoryMode::default(),
            sandbox: false,
            cycle_size: None,
            snapshot: None,
            reconstruct: false,
            reset_db: false,
        }
    }
}

impl Args {
    pub fn parse<I, T>(itr: I) -> Result<Args, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let m: ArgMatches = cli().try_get_matches_from(itr)?;
        let mut defaults: Args = Default::default();

        if let Some(config_file) = m.get_one::<String>("configfile") {
            let config_str = fs::read_to_string(config_file)?;
            defaults = from_str(&config_str).map_err(|toml_error| {
                clap::Error::raw(
                    clap::error::ErrorKind::ValueValidation,
                    format!("failed parsing config file, reason: {}", toml_error.message()),
                )
            })?;
        }

        let history_mode = match m.get_one::<String>("history-mode") {
            Some(raw) => raw
                .parse::<HistoryMode>()
                .map_err(|reason| clap::Error::raw(clap::error::ErrorKind::ValueValidation, reason))?,
            None => defaults.history_mode,
        };

        Ok(Args {
            appdir: m.get_one::<String>("appdir").cloned().or(defaults.appdir),
            logdir: m.get_one::<String>("logdir").cloned().or(defaults.logdir),
            no_log_files: arg_match_unwrap_or::<bool>(&m, "nologfiles", defaults.no_log_files),
            log_level: arg_match_unwrap_or::<String>(&m, "log_level", defaults.log_level),
            history_mode,
            sandbox: arg_match_unwrap_or::<bool>(&m, "sandbox", defaults.sandbox),
            cycle_size: m.get_one::<u64>("cycle-size").cloned().or(defaults.cycle_size),
            snapshot: m.get_one::<String>("snapshot").cloned().or(defaults.snapshot),
            reconstruct: arg_match_unwrap_or::<bool>(&m, "reconstruct", defaults.reconstruct),
            reset_db: arg_match_unwrap_or::<bool>(&m, "reset-db", defaults.reset_db),
        })
    }

    /// Builds the store configuration implied by the arguments
    pub fn build_config(&self) -> Config {
        let mut params = if self.sandbox { SANDBOX_PARAMS } else { MAINNET_PARAMS };
        if let Some(cycle_size) = self.cycle_size {
            params.cycle_size = cycle_size;
        }
        Config::new(params).with_history_mode(self.history_mode)
    }
}

pub fn cli() -> Command {
    let defaults: Args = Default::default();

    Command::new("chainstored")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(-C --configfile <CONFIG_FILE> "Path of config file."))
        .arg(arg!(-b --appdir <DATA_DIR> "Directory to store data."))
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(arg!(--nologfiles "Disable logging to files."))
        .arg(
            Arg::new("log_level")
                .short('d')
                .long("loglevel")
                .env("CHAINSTORED_LOG_LEVEL")
                .value_name("LEVEL")
                .default_value("info")
                .require_equals(true)
                .help("Logging level for all subsystems {off, error, warn, info, debug, trace}\n-- You may also specify <subsystem>=<level>,<subsystem2>=<level>,... to set the log level for individual subsystems.".to_string()),
        )
        .arg(
            Arg::new("history-mode")
                .long("history-mode")
                .value_name("MODE")
                .require_equals(true)
                .help(format!("Storage retention policy {{archive, full, rolling}} (default: {}).", defaults.history_mode)),
        )
        .arg(arg!(--sandbox "Use the sandbox chain parameters (tiny cycles)."))
        .arg(
            Arg::new("cycle-size")
                .long("cycle-size")
                .value_name("LEVELS")
                .require_equals(true)
                .value_parser(clap::value_parser!(u64).range(1..))
                .help("Override the chain cycle size."),
        )
        .arg(
            Arg::new("snapshot")
                .long("snapshot")
                .value_name("FILE")
                .require_equals(true)
                .help("Bootstrap the store from a snapshot file on the first launch."),
        )
        .arg(arg!(--reconstruct "Reconstruct the storage right after the snapshot import."))
        .arg(arg!(--"reset-db" "Reset the database before starting the node."))
}

fn arg_match_unwrap_or<T: Clone + Send + Sync + 'static>(m: &ArgMatches, arg_id: &str, default: T) -> T {
    m.get_one::<T>(arg_id).cloned().unwrap_or(default)
}
