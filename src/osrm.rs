//! OSRM route service glue.
//!
//! Builds route request URLs and converts OSRM JSON responses into
//! [`Route`] values. The HTTP call itself belongs to the host.

use serde::Deserialize;

use crate::error::NavError;
use crate::geo::Point;
use crate::reroute::{RerouteRequest, RouteOutcome};
use crate::route::{ManeuverType, Modifier, Route, RouteStep};

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

/// GeoJSON line string, coordinates as `[lon, lat]`.
#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    #[serde(default)]
    distance: f64,
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    exit: Option<u32>,
    location: [f64; 2],
    #[serde(default)]
    instruction: Option<String>,
}

fn lon_lat(coordinate: [f64; 2]) -> Point {
    Point {
        lat: coordinate[1],
        lon: coordinate[0],
    }
}

/// Driving route URL from `origin` to `destination` with full GeoJSON
/// geometry and steps.
pub fn route_url(base: &str, origin: Point, destination: Point, avoid_motorways: bool) -> String {
    let exclude = if avoid_motorways { "&exclude=motorway" } else { "" };
    format!(
        "{}/route/v1/driving/{},{};{},{}?overview=full&geometries=geojson&steps=true{exclude}",
        base.trim_end_matches('/'),
        origin.lon,
        origin.lat,
        destination.lon,
        destination.lat,
    )
}

/// URL answering a reroute request.
pub fn reroute_url(base: &str, request: &RerouteRequest) -> String {
    route_url(base, request.origin, request.destination, request.avoid_motorways)
}

/// Convert an OSRM response into the first route it contains.
///
/// Steps of all legs are concatenated in order.
pub fn parse_route(json: &str) -> Result<Route, NavError> {
    let response: OsrmResponse = serde_json::from_str(json)?;
    if response.code != "Ok" {
        return Err(NavError::NoRoute);
    }

    let route = response
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(NavError::NoRoute)?;

    let geometry: Vec<Point> = route.geometry.coordinates.into_iter().map(lon_lat).collect();

    let steps: Vec<RouteStep> = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| {
            let maneuver_type = ManeuverType::from_tag(&step.maneuver.kind);
            RouteStep {
                index: 0,
                distance_m: step.distance,
                name: step.name,
                instruction: step.maneuver.instruction.unwrap_or_default(),
                maneuver_type,
                modifier: Modifier::from_tag(step.maneuver.modifier.as_deref()),
                roundabout_exit: step.maneuver.exit,
                location: lon_lat(step.maneuver.location),
            }
        })
        .collect();

    Route::new(geometry, steps).map_err(|_| NavError::NoRoute)
}

/// Like [`parse_route`], but a "no route" answer is an outcome rather than
/// an error. Malformed JSON is still an error.
pub fn parse_outcome(json: &str) -> Result<RouteOutcome, NavError> {
    match parse_route(json) {
        Ok(route) => Ok(RouteOutcome::Found(route)),
        Err(NavError::NoRoute) => Ok(RouteOutcome::NotFound),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reroute::RerouteTicket;

    const RESPONSE: &str = r#"{
  "code": "Ok",
  "routes": [{
    "distance": 700.0,
    "geometry": {
      "type": "LineString",
      "coordinates": [[130.4000, 33.5900], [130.4054, 33.5900], [130.4054, 33.5918]]
    },
    "legs": [{
      "steps": [
        {
          "distance": 500.0,
          "name": "Main St",
          "maneuver": {
            "type": "turn", "modifier": "right",
            "location": [130.4000, 33.5900],
            "instruction": "Turn right onto Main St"
          }
        },
        {
          "distance": 200.0,
          "name": "Oak Ave",
          "maneuver": {
            "type": "roundabout", "modifier": "left", "exit": 2,
            "location": [130.4054, 33.5900]
          }
        },
        {
          "distance": 0.0,
          "name": "",
          "maneuver": { "type": "arrive", "location": [130.4054, 33.5918] }
        }
      ]
    }]
  }]
}"#;

    #[test]
    fn parse_route_swaps_coordinates() {
        let route = parse_route(RESPONSE).unwrap();
        assert_eq!(route.geometry().len(), 3);
        assert!((route.geometry()[0].lat - 33.59).abs() < 1e-9);
        assert!((route.geometry()[0].lon - 130.40).abs() < 1e-9);
        assert!((route.destination().lat - 33.5918).abs() < 1e-9);
    }

    #[test]
    fn parse_route_maps_steps() {
        let route = parse_route(RESPONSE).unwrap();
        let steps = route.steps();
        assert_eq!(steps.len(), 3);

        assert_eq!(steps[0].maneuver_type, ManeuverType::Turn);
        assert_eq!(steps[0].modifier, Modifier::Right);
        assert_eq!(steps[0].instruction, "Turn right onto Main St");
        assert_eq!(steps[0].distance_m, 500.0);

        assert_eq!(steps[1].index, 1);
        assert_eq!(steps[1].maneuver_type, ManeuverType::Roundabout);
        assert_eq!(steps[1].roundabout_exit, Some(2));
        assert_eq!(steps[1].instruction, "");
        assert_eq!(steps[1].name, "Oak Ave");

        assert_eq!(steps[2].maneuver_type, ManeuverType::Other);
        assert_eq!(steps[2].modifier, Modifier::None);
    }

    #[test]
    fn non_ok_code_is_no_route() {
        let json = r#"{"code": "NoRoute", "message": "Impossible route between points"}"#;
        assert!(matches!(parse_route(json), Err(NavError::NoRoute)));
        assert!(matches!(parse_outcome(json), Ok(RouteOutcome::NotFound)));
    }

    #[test]
    fn empty_routes_is_no_route() {
        assert!(matches!(parse_route(r#"{"code": "Ok", "routes": []}"#), Err(NavError::NoRoute)));
        assert!(matches!(parse_route(r#"{"code": "Ok", "routes": null}"#), Err(NavError::NoRoute)));
    }

    #[test]
    fn malformed_json_stays_an_error() {
        assert!(matches!(parse_outcome("<html>"), Err(NavError::Json(_))));
    }

    #[test]
    fn route_url_matches_osrm_layout() {
        let url = route_url(
            "https://router.project-osrm.org/",
            Point::new(33.59, 130.40),
            Point::new(33.60, 130.42),
            false,
        );
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/driving/130.4,33.59;130.42,33.6\
             ?overview=full&geometries=geojson&steps=true"
        );
    }

    #[test]
    fn reroute_url_excludes_motorways_on_request() {
        let request = RerouteRequest {
            ticket: RerouteTicket { generation: 1, sequence: 0 },
            origin: Point::new(33.59, 130.40),
            destination: Point::new(33.60, 130.42),
            avoid_motorways: true,
        };
        assert!(reroute_url("http://localhost:5000", &request).ends_with("&steps=true&exclude=motorway"));
    }
}
