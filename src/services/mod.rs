//! Service module that talks to the Location Service endpoints and turns the replies into layers

pub mod client;
pub mod map;
pub mod maps;
pub mod place;
pub mod places;
pub mod routes;

// rexport the types every command needs
pub use client::{ApiClient, HttpTransport, ReqwestTransport};
pub use map::{MapOptions, MapTiles};
pub use maps::{MapStyle, RasterMaps, RasterMapsOptions};
pub use place::{PlaceSearch, PlaceSearchOptions};
pub use places::{TextSearch, TextSearchOptions};
pub use routes::{RouteCalculator, RoutesOptions};

use crate::layer::{Color, Labeling, MarkerShape, Renderer};

/// Placeholder in a configured base URL that is replaced by the region
static REGION_PLACEHOLDER: &str = "{region}";

/// Tile coordinate placeholders, filled in by the host's tile loader
pub static TILE_TEMPLATE: &str = "{z}/{x}/{y}";

/// Marker used for every search result layer
pub fn search_result_renderer() -> Renderer {
    Renderer::Marker {
        shape: MarkerShape::Circle,
        color: Color::rgb(0, 124, 191),
        size: 3.0,
    }
}

/// Black size 10 text labels drawn from `field`
pub fn search_result_labeling(field: &str) -> Labeling {
    Labeling {
        field: field.to_string(),
        size: 10.0,
        color: Color::BLACK,
    }
}

/// Percent-encode one URL path segment or host label
pub(crate) fn encode_segment(value: &str) -> String {
    // the form encoder writes spaces as '+', a literal '+' is already escaped as %2B
    form_urlencoded::byte_serialize(value.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// Query string carrying the API key under parameter `name`
pub(crate) fn key_query(name: &str, apikey: &str) -> String {
    form_urlencoded::Serializer::new(String::new())
        .append_pair(name, apikey)
        .finish()
}

/// Substitute the region into a configured base URL and strip any trailing slash
pub(crate) fn expand_base_url(base_url: &str, region: &str) -> String {
    base_url
        .replace(REGION_PLACEHOLDER, &encode_segment(region))
        .trim_end_matches('/')
        .to_string()
}
