use crate::geo::{ip_location, nominatim};
use clap::Parser;

/// Whereabouts - live location tracking and place search on a map
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Settings {
    /// Seconds between location polls while tracking at high accuracy
    #[clap(long, default_value = "30")]
    pub poll_interval_secs: u64,

    /// Base URL of the geocoding and place search service
    #[clap(long, default_value = nominatim::DEFAULT_URL)]
    pub geocoder_url: String,

    /// Base URL of the IP geolocation service
    #[clap(long, default_value = ip_location::DEFAULT_URL)]
    pub locator_url: String,

    /// Maximum number of search candidates to request
    #[clap(long, default_value = "8")]
    pub max_candidates: usize,

    /// Start location tracking immediately on launch
    #[clap(long, default_value = "false")]
    pub auto_track: bool,

    /// Do not keep the map centered on the latest fix
    #[clap(long, default_value = "false")]
    pub no_follow: bool,
}

impl Settings {
    /// Parse settings from the command line
    pub fn from_cli() -> Self {
        Settings::parse()
    }
}
