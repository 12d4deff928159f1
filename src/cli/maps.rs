//! Define the maps subcommand that adds a raster tile map
use super::Context;
use crate::config::FeatureType;
use crate::services::{MapStyle, RasterMaps, RasterMapsOptions};
use structopt::StructOpt;

/// Add a raster tile layer in one of the predefined styles
#[derive(Debug, StructOpt)]
pub struct MapsOpts {
    /// Map style: Standard, Monochrome, Hybrid or Satellite
    #[structopt(name = "STYLE")]
    style: MapStyle,
}

/// Implementation of the `maps` subcommand
pub fn maps_command(ctx: &mut Context, opts: MapsOpts) -> Result<(), Box<dyn std::error::Error>> {
    let options: RasterMapsOptions = ctx.config.feature_options(FeatureType::Maps)?;
    RasterMaps::new(options).add_to_map(&ctx.settings, opts.style, &mut ctx.project)?;
    Ok(())
}
