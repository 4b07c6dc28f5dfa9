use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("WebGL not supported or failed to initialize: {0}")]
    SurfaceUnavailable(String),

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ViewerError {
    /// Whether an error message should replace the container contents.
    /// Without a container there is nowhere to put it.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, ViewerError::ContainerNotFound(_))
    }
}

impl From<JsValue> for ViewerError {
    fn from(value: JsValue) -> Self {
        let message = value
            .as_string()
            .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
            .unwrap_or_else(|| "unknown JavaScript error".to_string());
        ViewerError::Setup(message)
    }
}

impl From<ViewerError> for JsValue {
    fn from(err: ViewerError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

impl From<serde_json::Error> for ViewerError {
    fn from(err: serde_json::Error) -> Self {
        ViewerError::Config(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for ViewerError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        ViewerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_container_is_not_reported_in_page() {
        assert!(!ViewerError::ContainerNotFound("sky".into()).is_reportable());
        assert!(ViewerError::SurfaceUnavailable("no webgl".into()).is_reportable());
        assert!(ViewerError::Setup("boom".into()).is_reportable());
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err: ViewerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, ViewerError::Config(_)));
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
