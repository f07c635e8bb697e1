/// WASM / JS API, only enabled on WASM
#[cfg(target_family = "wasm")]
pub mod api;
/// JSON stamping API datastructures, can be used even on non-WASM targets
pub mod structs;
