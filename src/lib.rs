mod config;
mod engine;
mod error;
mod host;
mod logging;
mod viz;

use wasm_bindgen::prelude::*;

use crate::config::{NightSkyConfig, SolarSystemConfig};
use crate::error::Result;
use crate::host::Mount;

pub use crate::error::ViewerError;

/// Handle returned to the page for one mounted viewer.
///
/// Construction never throws: a viewer that failed to start reports
/// `is_running() == false` and carries the message in `error()`.
#[wasm_bindgen]
pub struct Viewer {
    mount: Option<Mount>,
    error: Option<String>,
}

impl Viewer {
    fn from_result(result: Result<Mount>) -> Viewer {
        match result {
            Ok(mount) => Viewer { mount: Some(mount), error: None },
            Err(err) => Viewer { mount: None, error: Some(err.to_string()) },
        }
    }
}

#[wasm_bindgen]
impl Viewer {
    /// Stops rendering and detaches the viewer's event listeners.
    pub fn stop(&mut self) {
        if let Some(mount) = self.mount.take() {
            mount.shutdown();
            log::info!("viewer stopped");
        }
    }

    #[wasm_bindgen(js_name = isRunning)]
    pub fn is_running(&self) -> bool {
        self.mount.as_ref().map(Mount::is_running).unwrap_or(false)
    }

    pub fn error(&self) -> Option<String> {
        self.error.clone()
    }
}

#[wasm_bindgen(js_name = solarSystem)]
pub fn solar_system(container_id: &str) -> Viewer {
    solar_system_with_config(container_id, JsValue::UNDEFINED)
}

/// Like [`solar_system`], with a partial `SolarSystemConfig` object.
#[wasm_bindgen(js_name = solarSystemWithConfig)]
pub fn solar_system_with_config(container_id: &str, config: JsValue) -> Viewer {
    logging::init();
    Viewer::from_result(host::mount_or_report(container_id, "Solar System", |document, container| {
        let config = SolarSystemConfig::from_js(config)?;
        host::mount_solar_system(document, container, config)
    }))
}

#[wasm_bindgen(js_name = nightSky)]
pub fn night_sky(container_id: &str) -> Viewer {
    night_sky_with_config(container_id, JsValue::UNDEFINED)
}

/// Like [`night_sky`], with a partial `NightSkyConfig` object.
#[wasm_bindgen(js_name = nightSkyWithConfig)]
pub fn night_sky_with_config(container_id: &str, config: JsValue) -> Viewer {
    logging::init();
    Viewer::from_result(host::mount_or_report(container_id, "Night Sky", |document, container| {
        let config = NightSkyConfig::from_js(config)?;
        host::mount_night_sky(document, container, config)
    }))
}
