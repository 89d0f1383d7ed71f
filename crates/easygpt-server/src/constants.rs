pub const BINARY_NAME: &str = env!("CARGO_BIN_NAME");
pub const DEFAULT_GENERATE_MAX_TOKENS: u32 = 800;
pub const DEFAULT_FOLLOWUP_MAX_TOKENS: u32 = 400;
pub const DEFAULT_TEMPERATURE: f64 = 0.2;
pub const MAX_TEMPERATURE: f64 = 2.0;
