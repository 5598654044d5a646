//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to a `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! The engine lives behind an opaque `long` handle. Calls that produce
//! events return them as a JSON string `{"events": [...]}`, or
//! `{"error": "..."}` when the call failed.

use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jlong, jstring};
use jni::JNIEnv;
use log::{error, LevelFilter};
use serde::Serialize;

use crate::config::NavConfig;
use crate::engine::Engine;
use crate::error::NavError;
use crate::event::NavEvent;
use crate::geo::Point;
use crate::narration::Locale;
use crate::reroute::RerouteTicket;
use crate::session::NavMode;
use crate::source::PositionSample;
use crate::{gpx, osrm};

#[derive(Serialize)]
struct EventsReply<'a> {
    events: &'a [NavEvent],
}

#[derive(Serialize)]
struct ErrorReply {
    error: String,
}

/// Render an engine call result for the host.
fn reply_json(result: Result<Vec<NavEvent>, NavError>) -> String {
    let encoded = match &result {
        Ok(events) => serde_json::to_string(&EventsReply { events }),
        Err(err) => serde_json::to_string(&ErrorReply { error: err.to_string() }),
    };
    encoded.unwrap_or_else(|e| format!(r#"{{"error":"JSON serialize error: {e}"}}"#))
}

fn mode_from_flag(simulated: bool) -> NavMode {
    if simulated {
        NavMode::Simulated
    } else {
        NavMode::Live
    }
}

fn start_from_osrm(engine: &mut Engine, osrm_json: &str, simulated: bool) -> String {
    let result = osrm::parse_route(osrm_json)
        .and_then(|route| engine.start(route, mode_from_flag(simulated)));
    reply_json(result)
}

fn start_from_gpx(engine: &mut Engine, gpx_data: &[u8], simulated: bool) -> String {
    let result = gpx::route_from_bytes(gpx_data)
        .and_then(|route| engine.start(route, mode_from_flag(simulated)));
    reply_json(result)
}

/// NaN heading marks "no heading" from the platform.
fn advance_with(engine: &mut Engine, lat: f64, lon: f64, heading: f64, timestamp_ms: i64) -> String {
    let heading = if heading.is_nan() { None } else { Some(heading) };
    let sample = PositionSample::new(lat, lon, heading, timestamp_ms);
    reply_json(engine.advance(&sample))
}

/// An empty response body means the route service failed outright.
fn complete_with(engine: &mut Engine, ticket: RerouteTicket, osrm_json: &str) -> String {
    let outcome = if osrm_json.trim().is_empty() {
        Ok(crate::reroute::RouteOutcome::NotFound)
    } else {
        osrm::parse_outcome(osrm_json)
    };
    reply_json(outcome.and_then(|outcome| engine.complete_reroute(ticket, outcome)))
}

fn to_jstring(env: &JNIEnv, text: &str) -> jstring {
    match env.new_string(text) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Result<String, NavError> {
    Ok(env.get_string(value)?.into())
}

/// Borrow the engine behind a handle from [`Java_com_ndkarte_guide_RustBridge_engineCreate`].
///
/// # Safety
/// `handle` must be zero or a live handle that has not been destroyed.
unsafe fn engine_mut<'a>(handle: jlong) -> Option<&'a mut Engine> {
    (handle as *mut Engine).as_mut()
}

const NO_ENGINE: &str = r#"{"error":"invalid engine handle"}"#;

/// Returns the library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Route `log` output to logcat. Safe to call more than once.
/// Maps to: RustBridge.initLogging()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_initLogging(
    _env: JNIEnv,
    _class: JClass,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("ndguide"),
    );
}

/// Maps to: RustBridge.formatDistance(meters: Double, language: String) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_formatDistance(
    mut env: JNIEnv,
    _class: JClass,
    meters: jdouble,
    language: JString,
) -> jstring {
    let locale = read_string(&mut env, &language)
        .map(|tag| Locale::from_tag(&tag))
        .unwrap_or_default();
    to_jstring(&env, &locale.format_distance(meters))
}

/// Maps to: RustBridge.routeUrl(base, originLat, originLon, destLat, destLon, avoidMotorways) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_routeUrl(
    mut env: JNIEnv,
    _class: JClass,
    base: JString,
    origin_lat: jdouble,
    origin_lon: jdouble,
    dest_lat: jdouble,
    dest_lon: jdouble,
    avoid_motorways: jboolean,
) -> jstring {
    let base = read_string(&mut env, &base)
        .unwrap_or_else(|_| crate::config::DEFAULT_OSRM_BASE_URL.to_string());
    let url = osrm::route_url(
        &base,
        Point::new(origin_lat, origin_lon),
        Point::new(dest_lat, dest_lon),
        avoid_motorways != 0,
    );
    to_jstring(&env, &url)
}

/// Create an engine from a JSON config. Returns 0 on invalid config.
/// Maps to: RustBridge.engineCreate(configJson: String) -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineCreate(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let config = read_string(&mut env, &config_json).and_then(|json| NavConfig::from_json(&json));
    match config {
        Ok(config) => Box::into_raw(Box::new(Engine::new(config))) as jlong,
        Err(e) => {
            error!("engineCreate: {e}");
            0
        }
    }
}

/// Maps to: RustBridge.engineStart(handle: Long, osrmJson: String, simulated: Boolean) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineStart(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    osrm_json: JString,
    simulated: jboolean,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    let reply = match read_string(&mut env, &osrm_json) {
        Ok(json) => start_from_osrm(engine, &json, simulated != 0),
        Err(e) => reply_json(Err(e)),
    };
    to_jstring(&env, &reply)
}

/// Maps to: RustBridge.engineStartGpx(handle: Long, gpx: String, simulated: Boolean) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineStartGpx(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    gpx_text: JString,
    simulated: jboolean,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    let reply = match read_string(&mut env, &gpx_text) {
        Ok(text) => start_from_gpx(engine, text.as_bytes(), simulated != 0),
        Err(e) => reply_json(Err(e)),
    };
    to_jstring(&env, &reply)
}

/// `heading` is NaN when the sensor has none.
/// Maps to: RustBridge.engineAdvance(handle, lat, lon, heading, timestampMs) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineAdvance(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lon: jdouble,
    heading: jdouble,
    timestamp_ms: jlong,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    to_jstring(&env, &advance_with(engine, lat, lon, heading, timestamp_ms))
}

/// `osrmJson` is the route service body, or empty when the request failed.
/// Maps to: RustBridge.engineCompleteReroute(handle, generation, sequence, osrmJson) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineCompleteReroute(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    generation: jlong,
    sequence: jlong,
    osrm_json: JString,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    let ticket = RerouteTicket {
        generation: generation as u64,
        sequence: sequence as u64,
    };
    let reply = match read_string(&mut env, &osrm_json) {
        Ok(json) => complete_with(engine, ticket, &json),
        Err(e) => reply_json(Err(e)),
    };
    to_jstring(&env, &reply)
}

/// Maps to: RustBridge.engineFinishSimulation(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineFinishSimulation(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    to_jstring(&env, &reply_json(Ok(engine.finish_simulation())))
}

/// Maps to: RustBridge.engineStop(handle: Long, acknowledge: Boolean) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineStop(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    acknowledge: jboolean,
) -> jstring {
    // SAFETY: handle comes from engineCreate and the host serializes calls
    let Some(engine) = (unsafe { engine_mut(handle) }) else {
        return to_jstring(&env, NO_ENGINE);
    };
    to_jstring(&env, &reply_json(Ok(engine.stop(acknowledge != 0))))
}

/// Free an engine. The handle must not be used afterwards.
/// Maps to: RustBridge.engineDestroy(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_ndkarte_guide_RustBridge_engineDestroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: handle comes from engineCreate and is destroyed once
        drop(unsafe { Box::from_raw(handle as *mut Engine) });
    }
}
