//! Constants used across the Bridgeflow workspace.

/// The filename for Bridgeflow's optional project configuration.
pub const CONFIG_FILE: &str = "bridgeflow.toml";

/// The application framework tool (dependency fetch, clean, launch).
pub const DEFAULT_APP_PROGRAM: &str = "flutter";

/// The native library toolchain.
pub const DEFAULT_NATIVE_PROGRAM: &str = "cargo";

/// Native project subdirectory, relative to the project root.
pub const DEFAULT_NATIVE_DIR: &str = "rust";

/// The cross-language binding generator and its default arguments.
pub const DEFAULT_CODEGEN_PROGRAM: &str = "flutter_rust_bridge_codegen";
pub const DEFAULT_CODEGEN_ARGS: &[&str] = &["generate"];

/// Name used in headers when the project root has no usable directory name.
pub const FALLBACK_PROJECT_NAME: &str = "project";
