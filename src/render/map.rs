/// Interactive map artifact.
///
/// Renders a single self-contained HTML page: Leaflet from its CDN, three
/// base tile layers with a layer switcher, one coloured marker and
/// translucent circle per plant, and a marker plus radius circle for the
/// user. Plant and user data are embedded as a JSON literal; all labels are
/// built client-side with `textContent`-style escaping, so plant names never
/// reach the page as raw HTML.

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::MapSettings;
use crate::model::{ClassifiedPlant, SafetyTier, UserLocation};

pub const SAFE_COLOR: &str = "#28a745";
pub const MODERATE_COLOR: &str = "#ffc107";
pub const DANGEROUS_COLOR: &str = "#dc3545";
pub const UNKNOWN_COLOR: &str = "blue";
pub const USER_COLOR: &str = "#007bff";

const LEAFLET_VERSION: &str = "1.9.4";

pub fn tier_color(tier: SafetyTier) -> &'static str {
    match tier {
        SafetyTier::Safe => SAFE_COLOR,
        SafetyTier::Moderate => MODERATE_COLOR,
        SafetyTier::Dangerous => DANGEROUS_COLOR,
        SafetyTier::Unknown => UNKNOWN_COLOR,
    }
}

#[derive(Serialize)]
struct MapPlant<'a> {
    name: &'a str,
    lat: f64,
    lon: f64,
    age: Option<f64>,
    safety: &'static str,
    color: &'static str,
}

#[derive(Serialize)]
struct MapUser {
    lat: f64,
    lon: f64,
    popup: String,
    radius_m: f64,
    radius_label: String,
}

#[derive(Serialize)]
struct MapData<'a> {
    zoom: u8,
    plant_radius_m: f64,
    plants: Vec<MapPlant<'a>>,
    user: MapUser,
}

/// Renders the map page.
pub fn render_map_html(
    plants: &[ClassifiedPlant],
    user: &UserLocation,
    on_site: &[String],
    settings: &MapSettings,
) -> String {
    let popup = if on_site.is_empty() {
        "Your Location".to_string()
    } else {
        format!("On site at: {}", on_site.join(", "))
    };

    let data = MapData {
        zoom: settings.default_zoom,
        plant_radius_m: settings.plant_circle_radius_m,
        plants: plants
            .iter()
            .map(|p| MapPlant {
                name: &p.record.name,
                lat: p.record.latitude,
                lon: p.record.longitude,
                age: p.record.age_years,
                safety: p.safety.as_str(),
                color: tier_color(p.safety),
            })
            .collect(),
        user: MapUser {
            lat: user.latitude(),
            lon: user.longitude(),
            popup,
            radius_m: settings.user_circle_radius_m,
            radius_label: format!("{}km radius from your location", settings.user_circle_radius_m / 1000.0),
        },
    };

    // serde_json output is a valid JS literal; only "</" could end the
    // script element early.
    let json = serde_json::to_string(&data)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/");

    PAGE_TEMPLATE
        .replace("{{LEAFLET_VERSION}}", LEAFLET_VERSION)
        .replace("{{USER_COLOR}}", USER_COLOR)
        .replace("{{MAP_DATA}}", &json)
}

/// Writes the page to `<output_dir>/<file_name>`, creating the directory if
/// needed. Returns the full path.
pub fn write_map_file(output_dir: impl AsRef<Path>, file_name: &str, html: &str) -> std::io::Result<PathBuf> {
    let dir = output_dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let path = dir.join(file_name);
    std::fs::write(&path, html)?;
    Ok(path)
}

/// `map_<session>_<seq>.html`
pub fn map_file_name(session: &str, seq: u64) -> String {
    format!("map_{}_{}.html", session, seq)
}

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Nuclear Plant Proximity Map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@{{LEAFLET_VERSION}}/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@{{LEAFLET_VERSION}}/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
const DATA = {{MAP_DATA}};

function esc(s) {
  const div = document.createElement("div");
  div.textContent = String(s);
  return div.innerHTML;
}

const osm = L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
  attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors'
});
const dark = L.tileLayer("https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png", {
  attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors &copy; <a href="https://carto.com/attributions">CARTO</a>'
});
const light = L.tileLayer("https://{s}.basemaps.cartocdn.com/light_all/{z}/{x}/{y}{r}.png", {
  attribution: '&copy; <a href="https://www.openstreetmap.org/copyright">OpenStreetMap</a> contributors &copy; <a href="https://carto.com/attributions">CARTO</a>'
});

const map = L.map("map", { layers: [osm] }).setView([DATA.user.lat, DATA.user.lon], DATA.zoom);
L.control.layers({ "OpenStreetMap": osm, "CartoDB Dark Matter": dark, "CartoDB Positron": light }).addTo(map);

for (const p of DATA.plants) {
  const age = p.age === null ? "unknown" : p.age;
  L.circle([p.lat, p.lon], {
    radius: DATA.plant_radius_m, color: p.color, fillColor: p.color, fillOpacity: 0.2
  }).bindTooltip(esc(p.name) + " - " + p.safety + " (" + age + " years)").addTo(map);
  L.circleMarker([p.lat, p.lon], {
    radius: 7, color: "white", weight: 2, fillColor: p.color, fillOpacity: 1
  }).bindPopup("<b>" + esc(p.name) + "</b><br>Age: " + age + " years<br>Status: " + p.safety).addTo(map);
}

L.marker([DATA.user.lat, DATA.user.lon])
  .bindTooltip("Your Location")
  .bindPopup(esc(DATA.user.popup))
  .addTo(map);
L.circle([DATA.user.lat, DATA.user.lon], {
  radius: DATA.user.radius_m, color: "{{USER_COLOR}}", fillColor: "{{USER_COLOR}}", fillOpacity: 0.1
}).bindTooltip(esc(DATA.user.radius_label)).addTo(map);
</script>
</body>
</html>
"#;
