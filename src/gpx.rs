//! GPX route import.
//!
//! Wraps the `gpx` crate and turns a planned GPX route (or, failing that,
//! a recorded track) into a navigable [`Route`]. GPX has no maneuver
//! data, so steps are synthesized from the bearing change at each vertex.
//! Used to drive simulated playback from a file.

use std::io::Read;

use crate::error::NavError;
use crate::geo::{bearing_between, haversine, Point};
use crate::route::{ManeuverType, Modifier, Route, RouteStep};

/// Parse GPX and build a route from its first `<rte>`, or from the
/// flattened first `<trk>` when the file has no routes.
pub fn route_from_gpx<R: Read>(reader: R) -> Result<Route, NavError> {
    let gpx = gpx::read(reader).map_err(|e| NavError::Gpx(e.to_string()))?;

    let points: Vec<Point> = match gpx.routes.first() {
        Some(route) => route
            .points
            .iter()
            .map(|wp| Point::new(wp.point().y(), wp.point().x()))
            .collect(),
        None => gpx
            .tracks
            .first()
            .map(|track| {
                track
                    .segments
                    .iter()
                    .flat_map(|seg| seg.points.iter())
                    .map(|wp| Point::new(wp.point().y(), wp.point().x()))
                    .collect()
            })
            .unwrap_or_default(),
    };

    let steps = synthesize_steps(&points);
    Route::new(points, steps)
}

/// Parse GPX from a byte slice. Convenience wrapper for JNI.
pub fn route_from_bytes(data: &[u8]) -> Result<Route, NavError> {
    route_from_gpx(data)
}

/// One depart step, one step per non-straight vertex, one arrival step.
///
/// Straight vertices are folded into the preceding step's distance.
fn synthesize_steps(points: &[Point]) -> Vec<RouteStep> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    if points.len() == 1 {
        return vec![RouteStep::new(ManeuverType::Other, first).with_instruction("Arrive at destination")];
    }

    // Distance along the line to each vertex
    let mut along = Vec::with_capacity(points.len());
    let mut total = 0.0;
    along.push(0.0);
    for w in points.windows(2) {
        total += haversine(&w[0], &w[1]);
        along.push(total);
    }

    // (vertex index, step) pairs, distances filled in afterwards
    let mut marked = vec![(0, RouteStep::new(ManeuverType::Other, first).with_instruction("Depart"))];

    for i in 1..points.len() - 1 {
        let modifier = turn_modifier(&points[i - 1], &points[i], &points[i + 1]);
        if modifier == Modifier::Straight {
            continue;
        }
        let step = RouteStep::new(ManeuverType::Turn, points[i])
            .with_modifier(modifier)
            .with_instruction(turn_instruction(modifier));
        marked.push((i, step));
    }

    let last = points.len() - 1;
    marked.push((
        last,
        RouteStep::new(ManeuverType::Other, points[last]).with_instruction("Arrive at destination"),
    ));

    let vertex_of: Vec<usize> = marked.iter().map(|(v, _)| *v).collect();
    marked
        .into_iter()
        .enumerate()
        .map(|(k, (vertex, step))| {
            let next_vertex = vertex_of.get(k + 1).copied().unwrap_or(vertex);
            step.with_distance(along[next_vertex] - along[vertex])
        })
        .collect()
}

/// Turn at B given the approach from A and the exit toward C, from the
/// relative bearing change (positive = right).
fn turn_modifier(a: &Point, b: &Point, c: &Point) -> Modifier {
    let mut angle = bearing_between(b, c) - bearing_between(a, b);

    // Normalize to [-180, 180]
    while angle > 180.0 {
        angle -= 360.0;
    }
    while angle < -180.0 {
        angle += 360.0;
    }

    let abs_angle = angle.abs();

    if abs_angle > 170.0 {
        Modifier::UTurn
    } else if abs_angle > 120.0 {
        if angle > 0.0 { Modifier::SharpRight } else { Modifier::SharpLeft }
    } else if abs_angle > 60.0 {
        if angle > 0.0 { Modifier::Right } else { Modifier::Left }
    } else if abs_angle > 20.0 {
        if angle > 0.0 { Modifier::SlightRight } else { Modifier::SlightLeft }
    } else {
        Modifier::Straight
    }
}

/// Instruction wording the text classifier recognizes.
fn turn_instruction(modifier: Modifier) -> &'static str {
    match modifier {
        Modifier::Right => "Turn right",
        Modifier::Left => "Turn left",
        Modifier::SlightRight => "Bear right",
        Modifier::SlightLeft => "Bear left",
        Modifier::SharpRight => "Make a sharp right",
        Modifier::SharpLeft => "Make a sharp left",
        Modifier::UTurn => "Make a U-turn",
        Modifier::Straight | Modifier::None => "Continue straight",
    }
}
