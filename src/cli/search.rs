//! Define the search subcommand for free text place searches
use super::{capture_click, ClickOpts, Context};
use crate::click::{CaptureTarget, CoordinateFields, FieldPair};
use crate::config::FeatureType;
use crate::services::{TextSearch, TextSearchOptions};
use structopt::StructOpt;

/// Search places by text, results are biased towards a position
#[derive(Debug, StructOpt)]
pub struct SearchOpts {
    /// Text to search for
    #[structopt(name = "TEXT")]
    text: String,
    /// Longitude of the bias position in degrees
    #[structopt(name = "LON")]
    lon: Option<String>,
    /// Latitude of the bias position in degrees
    #[structopt(name = "LAT")]
    lat: Option<String>,
    #[structopt(flatten)]
    click: ClickOpts,
}

/// Implementation of the `search` subcommand
pub fn search_command(
    ctx: &mut Context,
    opts: SearchOpts,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut fields = CoordinateFields {
        search: FieldPair::new(
            opts.lon.as_deref().unwrap_or_default(),
            opts.lat.as_deref().unwrap_or_default(),
        ),
        ..Default::default()
    };
    capture_click(ctx, &opts.click, CaptureTarget::SearchPosition, &mut fields)?;
    let position = fields.search.position()?;

    let options: TextSearchOptions = ctx.config.feature_options(FeatureType::Places)?;
    TextSearch::new(options).add_to_map(
        &ctx.settings,
        &ctx.client,
        &opts.text,
        position,
        &mut ctx.project,
    )?;
    Ok(())
}
