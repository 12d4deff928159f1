use location_service::cli::{Cli, Context};
use location_service::config::Config;
use location_service::host::MapProject;
use location_service::services::ApiClient;
use location_service::settings::{Settings, YamlSettingsStore};
use location_service::Error;
use log::{debug, error};
use simplelog::{Config as LogConfig, TermLogger, TerminalMode};
use std::fs::File;
use structopt::StructOpt;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Cli::from_args();

    // an explicit config file must exist, the default one is optional
    let config = match opt.config_path() {
        Some(path) => Config::load(&mut File::open(path)?)?,
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&mut File::open(&path)?)?
            } else {
                Config::default()
            }
        }
    };
    let level_filter = opt.verbosity(config.log_level());
    TermLogger::init(level_filter, LogConfig::default(), TerminalMode::Mixed)?;

    let store = YamlSettingsStore::in_data_dir();
    debug!("Loading settings from {:?}", store.path());
    let settings = Settings::load(Box::new(store))?;
    let project_dir = opt.project_dir().to_path_buf();
    let project = MapProject::open_dir(&project_dir)?;
    let client = ApiClient::with_timeout(config.timeout_secs())?;
    let modifies_project = opt.modifies_project();

    let mut ctx = Context {
        config,
        settings,
        client,
        project,
    };
    if let Err(e) = opt.execute_subcommand(&mut ctx) {
        match e.downcast_ref::<Error>() {
            Some(err) if err.is_transport_failure() => error!(
                "{}. Check the network connection and the configured region and API key",
                err
            ),
            _ => error!("{}", e),
        }
        return Err(e);
    }

    // only save the project once the command succeeded so nothing partial is kept
    if modifies_project {
        ctx.project.write_to_dir(&project_dir)?;
    }
    Ok(())
}
