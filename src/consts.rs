pub const TILE_ARRAY_SCHEMA_KEY: &str = "tile-array-schema";
pub const TILE_ARRAY_FORMAT_VERSION: &str = env!("CARGO_PKG_VERSION");
/// Cost factor reported on the chunk grid of disk-backed seeds.
pub const SEED_COST_FACTOR: f64 = 20.0;
pub const DEFAULT_BATCH_SIZE: usize = 8192;
