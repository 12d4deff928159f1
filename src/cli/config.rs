//! Define the config subcommand that shows and edits the stored settings
use super::Context;
use crate::settings::SettingKey;
use log::info;
use structopt::StructOpt;

/// Show or change the settings used by every request
#[derive(Debug, StructOpt)]
pub enum ConfigOpts {
    /// Print every setting, the API key is masked unless --reveal is given
    #[structopt(name = "show")]
    Show {
        #[structopt(long)]
        reveal: bool,
    },
    /// Print a single setting
    #[structopt(name = "get")]
    Get {
        /// One of region, apikey, map, place or routes
        #[structopt(name = "KEY")]
        key: SettingKey,
    },
    /// Store a new value for a setting
    #[structopt(name = "set")]
    Set {
        /// One of region, apikey, map, place or routes
        #[structopt(name = "KEY")]
        key: SettingKey,
        #[structopt(name = "VALUE")]
        value: String,
    },
}

/// Implementation of the `config` subcommand
pub fn config_command(
    ctx: &mut Context,
    opts: ConfigOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    match opts {
        ConfigOpts::Show { reveal } => {
            for (key, value) in ctx.settings.get_all() {
                let value = if key == SettingKey::ApiKey && !reveal {
                    mask(&value)
                } else {
                    value
                };
                println!("{:<14} {:<22} {}", key.as_str(), key.label(), value);
            }
        }
        ConfigOpts::Get { key } => println!("{}", ctx.settings.get(key)),
        ConfigOpts::Set { key, value } => {
            ctx.settings.set(key, value.trim())?;
            info!("Saved {}", key.label());
        }
    }
    Ok(())
}

/// Keep the last four characters of a secret visible
fn mask(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return "*".repeat(count);
    }
    let tail: String = value.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), tail)
}
