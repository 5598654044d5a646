pub mod android_jni;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod geo;
pub mod gpx;
pub mod narration;
pub mod navigator;
pub mod osrm;
pub mod reroute;
pub mod route;
pub mod session;
pub mod source;

pub use engine::Engine;
pub use error::NavError;
pub use event::NavEvent;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
