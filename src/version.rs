// Build-time identity from Cargo.toml

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Title shown on the first line of each text frame, e.g. "dataview 0.1.0".
pub fn banner() -> String {
    format!("{} {}", NAME, VERSION)
}
