//! Define the route subcommand
use super::{capture_click, ClickOpts, Context};
use crate::click::{CaptureTarget, CoordinateFields, FieldPair};
use crate::config::FeatureType;
use crate::services::{RouteCalculator, RoutesOptions};
use structopt::StructOpt;

/// Calculate a route between two positions and add its legs as lines
#[derive(Debug, StructOpt)]
pub struct RouteOpts {
    /// Longitude of the departure position in degrees
    #[structopt(name = "START_LON")]
    start_lon: Option<String>,
    /// Latitude of the departure position in degrees
    #[structopt(name = "START_LAT")]
    start_lat: Option<String>,
    /// Longitude of the destination in degrees
    #[structopt(name = "END_LON")]
    end_lon: Option<String>,
    /// Latitude of the destination in degrees
    #[structopt(name = "END_LAT")]
    end_lat: Option<String>,
    /// Write the map click into the departure instead of the destination
    #[structopt(long)]
    click_start: bool,
    #[structopt(flatten)]
    click: ClickOpts,
}

/// Implementation of the `route` subcommand
pub fn route_command(ctx: &mut Context, opts: RouteOpts) -> Result<(), Box<dyn std::error::Error>> {
    let text = |value: &Option<String>| value.clone().unwrap_or_default();
    let mut fields = CoordinateFields {
        route_start: FieldPair::new(&text(&opts.start_lon), &text(&opts.start_lat)),
        route_end: FieldPair::new(&text(&opts.end_lon), &text(&opts.end_lat)),
        ..Default::default()
    };
    let target = if opts.click_start {
        CaptureTarget::RouteStart
    } else {
        CaptureTarget::RouteEnd
    };
    capture_click(ctx, &opts.click, target, &mut fields)?;
    let start = fields.route_start.position()?;
    let end = fields.route_end.position()?;

    let options: RoutesOptions = ctx.config.feature_options(FeatureType::Routes)?;
    RouteCalculator::new(options).add_to_map(
        &ctx.settings,
        &ctx.client,
        start,
        end,
        &mut ctx.project,
    )?;
    Ok(())
}
