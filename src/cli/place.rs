//! Define the place subcommand that searches the place index around a position
use super::{capture_click, ClickOpts, Context};
use crate::click::{CaptureTarget, CoordinateFields, FieldPair};
use crate::config::FeatureType;
use crate::services::{PlaceSearch, PlaceSearchOptions};
use structopt::StructOpt;

/// Search the place index around a position and add the results as points
#[derive(Debug, StructOpt)]
pub struct PlaceOpts {
    /// Longitude of the search position in degrees
    #[structopt(name = "LON")]
    lon: Option<String>,
    /// Latitude of the search position in degrees
    #[structopt(name = "LAT")]
    lat: Option<String>,
    #[structopt(flatten)]
    click: ClickOpts,
}

/// Implementation of the `place` subcommand
pub fn place_command(ctx: &mut Context, opts: PlaceOpts) -> Result<(), Box<dyn std::error::Error>> {
    let mut fields = CoordinateFields {
        search: FieldPair::new(
            opts.lon.as_deref().unwrap_or_default(),
            opts.lat.as_deref().unwrap_or_default(),
        ),
        ..Default::default()
    };
    capture_click(ctx, &opts.click, CaptureTarget::SearchPosition, &mut fields)?;
    let position = fields.search.position()?;

    let options: PlaceSearchOptions = ctx.config.feature_options(FeatureType::Place)?;
    PlaceSearch::new(options).add_to_map(&ctx.settings, &ctx.client, position, &mut ctx.project)?;
    Ok(())
}
