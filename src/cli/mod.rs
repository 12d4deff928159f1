//! Define the application's command line interface
use crate::click::{CaptureTarget, ClickCapture, CoordinateFields, ViewCrs};
use crate::config::Config;
use crate::host::{MapHost, MapProject};
use crate::services::ApiClient;
use crate::settings::Settings;
use crate::Error;
use simplelog::LevelFilter;
use std::path::{Path, PathBuf};
use structopt::clap::AppSettings;
use structopt::StructOpt;

mod config;
use config::{config_command, ConfigOpts};
mod map;
use map::{map_command, MapOpts};
mod maps;
use maps::{maps_command, MapsOpts};
mod place;
use place::{place_command, PlaceOpts};
mod route;
use route::{route_command, RouteOpts};
mod search;
use search::{search_command, SearchOpts};
mod terms;
use terms::terms_command;

/// Add Amazon Location Service maps, place searches and routes to a map project
#[derive(Debug, StructOpt)]
#[structopt(name = "location-service")]
pub struct Cli {
    /// Set logging level to debug, use a second time (e.g. -vv) to set logging to trace
    #[structopt(short, long, parse(from_occurrences))]
    verbose: i32,
    /// Suppress info logging messages use a second time (e.g. -qq) to hide warnings
    #[structopt(short, long, parse(from_occurrences))]
    quiet: i32,
    /// Read the application config from this file instead of the default location
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
    /// Directory of the map project that layers are added to
    #[structopt(long, parse(from_os_str), default_value = "location-service-project")]
    project: PathBuf,
    #[structopt(subcommand)]
    cmd: Command,
}

impl Cli {
    /// Return the verbose flag counts as a log level filter
    pub fn verbosity(&self, default: LevelFilter) -> LevelFilter {
        if self.quiet == 1 {
            LevelFilter::Warn
        } else if self.quiet > 1 {
            LevelFilter::Error
        } else if self.verbose == 1 {
            LevelFilter::Debug
        } else if self.verbose > 1 {
            LevelFilter::Trace
        } else {
            default
        }
    }

    /// Config file given on the command line, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    pub fn project_dir(&self) -> &Path {
        &self.project
    }

    /// Return true if the subcommand adds layers to the map project
    pub fn modifies_project(&self) -> bool {
        self.cmd.modifies_project()
    }

    /// Consume options struct and return the result of subcommand execution
    pub fn execute_subcommand(self, ctx: &mut Context) -> Result<(), Box<dyn std::error::Error>> {
        self.cmd.execute(ctx)
    }
}

/// Everything a subcommand works with
pub struct Context {
    pub config: Config,
    pub settings: Settings,
    pub client: ApiClient,
    pub project: MapProject,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Show or change the stored service settings
    #[structopt(name = "config")]
    Config(ConfigOpts),
    /// Add the configured vector tile map
    #[structopt(name = "map")]
    Map(MapOpts),
    /// Add a raster tile map in one of the predefined styles
    #[structopt(name = "maps")]
    Maps(MapsOpts),
    /// Search the place index around a position
    #[structopt(name = "place", setting = AppSettings::AllowNegativeNumbers)]
    Place(PlaceOpts),
    /// Search places by free text near a position
    #[structopt(name = "search", setting = AppSettings::AllowNegativeNumbers)]
    Search(SearchOpts),
    /// Calculate a route between two positions
    #[structopt(name = "route", setting = AppSettings::AllowNegativeNumbers)]
    Route(RouteOpts),
    /// Print the AWS service terms URL
    #[structopt(name = "terms")]
    Terms,
}

impl Command {
    /// Consume enum variant and return the result of the command's execution
    fn execute(self, ctx: &mut Context) -> Result<(), Box<dyn std::error::Error>> {
        match self {
            Command::Config(opts) => config_command(ctx, opts),
            Command::Map(opts) => map_command(ctx, opts),
            Command::Maps(opts) => maps_command(ctx, opts),
            Command::Place(opts) => place_command(ctx, opts),
            Command::Search(opts) => search_command(ctx, opts),
            Command::Route(opts) => route_command(ctx, opts),
            Command::Terms => terms_command(),
        }
    }

    fn modifies_project(&self) -> bool {
        !matches!(self, Command::Config(_) | Command::Terms)
    }
}

/// A simulated map click that fills in coordinates before a request is sent
#[derive(Debug, StructOpt)]
pub struct ClickOpts {
    /// X coordinate of a map click, replaces the typed coordinates
    #[structopt(long, allow_hyphen_values = true)]
    click_x: Option<f64>,
    /// Y coordinate of a map click
    #[structopt(long, allow_hyphen_values = true)]
    click_y: Option<f64>,
    /// Coordinate system of the click, defaults to the project's view (EPSG:4326 or EPSG:3857)
    #[structopt(long)]
    click_crs: Option<ViewCrs>,
}

impl ClickOpts {
    /// Feed the click into a capture armed for `target`, returns true if a click was given
    fn apply(
        &self,
        target: CaptureTarget,
        view_crs: ViewCrs,
        fields: &mut CoordinateFields,
    ) -> Result<bool, Error> {
        match (self.click_x, self.click_y) {
            (Some(x), Some(y)) => {
                let mut capture = ClickCapture::new();
                capture.activate(target);
                let crs = self.click_crs.unwrap_or(view_crs);
                Ok(capture.handle_click(x, y, crs, fields))
            }
            (None, None) => Ok(false),
            _ => Err(Error::InvalidCoordinate(
                "--click-x and --click-y must be used together".to_string(),
            )),
        }
    }
}

/// Apply a click to `target` using the project's view coordinate system
fn capture_click(
    ctx: &Context,
    click: &ClickOpts,
    target: CaptureTarget,
    fields: &mut CoordinateFields,
) -> Result<(), Error> {
    click.apply(target, ctx.project.crs(), fields)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::click::FieldPair;

    fn click(x: Option<f64>, y: Option<f64>, crs: Option<ViewCrs>) -> ClickOpts {
        ClickOpts {
            click_x: x,
            click_y: y,
            click_crs: crs,
        }
    }

    #[test]
    fn verbosity_flags() {
        let cli = Cli::from_iter(&["location-service", "-vv", "terms"]);
        assert_eq!(cli.verbosity(LevelFilter::Info), LevelFilter::Trace);
        let cli = Cli::from_iter(&["location-service", "-q", "terms"]);
        assert_eq!(cli.verbosity(LevelFilter::Info), LevelFilter::Warn);
        let cli = Cli::from_iter(&["location-service", "terms"]);
        assert_eq!(cli.verbosity(LevelFilter::Info), LevelFilter::Info);
        assert_eq!(cli.project_dir(), Path::new("location-service-project"));
        assert!(!cli.modifies_project());
    }

    #[test]
    fn negative_coordinates_are_positional_values() {
        let cli = Cli::from_iter(&["location-service", "place", "-122.33", "47.61"]);
        assert!(cli.modifies_project());
        match cli.cmd {
            Command::Place(_) => {}
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn click_replaces_only_the_target_fields() {
        let mut fields = CoordinateFields {
            search: FieldPair::new("1", "2"),
            route_start: FieldPair::new("3", "4"),
            route_end: FieldPair::new("5", "6"),
        };
        let applied = click(Some(10.5), Some(20.25), None)
            .apply(CaptureTarget::RouteEnd, ViewCrs::Wgs84, &mut fields)
            .unwrap();
        assert!(applied);
        assert_eq!(fields.route_end, FieldPair::new("10.5", "20.25"));
        assert_eq!(fields.route_start, FieldPair::new("3", "4"));
    }

    #[test]
    fn no_click_leaves_fields_alone() {
        let mut fields = CoordinateFields::default();
        let applied = click(None, None, Some(ViewCrs::WebMercator))
            .apply(CaptureTarget::SearchPosition, ViewCrs::Wgs84, &mut fields)
            .unwrap();
        assert!(!applied);
        assert_eq!(fields, CoordinateFields::default());
    }

    #[test]
    fn half_a_click_is_rejected() {
        let mut fields = CoordinateFields::default();
        assert!(click(Some(1.0), None, None)
            .apply(CaptureTarget::SearchPosition, ViewCrs::Wgs84, &mut fields)
            .is_err());
    }
}
