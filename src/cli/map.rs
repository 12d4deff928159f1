//! Define the map subcommand that adds the configured vector tile map
use super::Context;
use crate::config::FeatureType;
use crate::services::{MapOptions, MapTiles};
use log::info;
use structopt::StructOpt;

/// Add the map resource named in the settings as a vector tile layer
#[derive(Debug, StructOpt)]
pub struct MapOpts {
    /// Download the style descriptor once to check the map name and API key
    #[structopt(long)]
    verify: bool,
}

/// Implementation of the `map` subcommand
pub fn map_command(ctx: &mut Context, opts: MapOpts) -> Result<(), Box<dyn std::error::Error>> {
    let options: MapOptions = ctx.config.feature_options(FeatureType::Map)?;
    let tiles = MapTiles::new(options);
    if opts.verify {
        tiles.verify_style(&ctx.settings, &ctx.client)?;
        info!("Style descriptor is valid");
    }
    tiles.add_to_map(&ctx.settings, &mut ctx.project)?;
    Ok(())
}
