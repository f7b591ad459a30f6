/// Source registry for the Chao Phraya basin monitoring service.
///
/// Defines the canonical list of monitored sources along with their metadata,
/// default URLs and the files each stream writes. This is the single source
/// of truth for station identifiers and file names; other modules reference
/// entries from here rather than hardcoding them.

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub const STATION_INBURI: &str = "inburi";
pub const STATION_CHAOPHRAYA_DAM: &str = "chaophraya_dam";
pub const STATION_SINGBURI_WEATHER: &str = "singburi_weather";

/// Dam telemetry code inside the embedded `json_data` document.
pub const DAM_TELEMETRY_CODE: &str = "C13";

/// Closed set of monitored sources. Lookup through this type cannot miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationId {
    ChaophrayaDam,
    Inburi,
    SingburiWeather,
}

impl StationId {
    pub const ALL: [StationId; 3] = [StationId::ChaophrayaDam, StationId::Inburi, StationId::SingburiWeather];

    pub fn station(self) -> &'static Station {
        match self {
            StationId::ChaophrayaDam => &CHAOPHRAYA_DAM,
            StationId::Inburi => &INBURI,
            StationId::SingburiWeather => &SINGBURI_WEATHER,
        }
    }
}

// ---------------------------------------------------------------------------
// Station metadata
// ---------------------------------------------------------------------------

/// Metadata for a single monitored source.
#[derive(Debug)]
pub struct Station {
    /// Stable identifier used in logs and state.
    pub id: &'static str,
    /// Name as it appears on the source page (matched verbatim when scraping).
    pub name: &'static str,
    /// Default URL; overridable through configuration.
    pub default_url: &'static str,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
    /// Log stream file name, relative to the data directory.
    pub log_file: &'static str,
    /// State file name, relative to the data directory.
    pub state_file: &'static str,
}

/// Chao Phraya Dam, Sapphaya, Chai Nat. Release here reaches Sing Buri
/// within a day.
pub static CHAOPHRAYA_DAM: Station = Station {
    id: STATION_CHAOPHRAYA_DAM,
    name: "เขื่อนเจ้าพระยา",
    default_url: "https://tiwrm.hii.or.th/DATA/REPORT/php/chart/chaopraya/small/chaopraya.php",
    latitude: 15.1614,
    longitude: 100.1783,
    log_file: "historical_log.csv",
    state_file: "last_data.json",
};

/// Water level gauge at the In Buri bridge, metres above MSL.
pub static INBURI: Station = Station {
    id: STATION_INBURI,
    name: "อินทร์บุรี",
    default_url: "https://singburi.thaiwater.net/wl",
    latitude: 15.0077,
    longitude: 100.3296,
    log_file: "inburi_log.csv",
    state_file: "inburi_bridge_data.json",
};

/// Forecast point for Sing Buri province.
pub static SINGBURI_WEATHER: Station = Station {
    id: STATION_SINGBURI_WEATHER,
    name: "สิงห์บุรี",
    default_url: "https://api.openweathermap.org/data/2.5",
    latitude: 14.8966,
    longitude: 100.3892,
    log_file: "weather_log.csv",
    state_file: "weather_alert_state.json",
};

/// All monitored sources, upstream first.
pub static STATION_REGISTRY: [&Station; 3] = [&CHAOPHRAYA_DAM, &INBURI, &SINGBURI_WEATHER];

/// Looks up a source by identifier. Returns `None` if not found.
pub fn find_station(id: &str) -> Option<&'static Station> {
    STATION_REGISTRY.iter().copied().find(|s| s.id == id)
}

/// Metadata for a known source.
pub fn station(id: StationId) -> &'static Station {
    id.station()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
