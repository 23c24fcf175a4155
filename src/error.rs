//! Error types for the engine.
//!
//! Nothing here is fatal to the animation: callers log and carry on. The
//! variants exist so that the conditions are visible instead of silently
//! becoming no-ops.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// The controller was used before `init()` or after `destroy()`.
    NotInitialized,
    /// The electron pool is full and the spawn was not forced.
    ResourceExhausted {
        requested: usize,
        capacity: usize,
    },
    /// A drawing backend call failed.
    Surface(String),
    /// A configuration value the engine cannot run with.
    InvalidConfig(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::NotInitialized => write!(f, "Engine is not initialized. Call init() first."),
            EngineError::ResourceExhausted { requested, capacity } => write!(
                f,
                "Electron pool exhausted: {} requested, capacity {}",
                requested, capacity
            ),
            EngineError::Surface(msg) => write!(f, "Surface error: {}", msg),
            EngineError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

#[cfg(target_arch = "wasm32")]
impl From<EngineError> for wasm_bindgen::JsValue {
    fn from(e: EngineError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}

#[cfg(target_arch = "wasm32")]
impl From<wasm_bindgen::JsValue> for EngineError {
    fn from(e: wasm_bindgen::JsValue) -> Self {
        EngineError::Surface(format!("{:?}", e))
    }
}
