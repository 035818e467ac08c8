pub const FORMAT_NAME: &str = "D2 Texture";
pub const FILE_EXT: &str = "d2";

pub const MAGIC_HEADER: [u8; 2] = *b"D2";

/// Alpha values below this are transparent everywhere in the pipeline.
pub const OPAQUE_THRESHOLD: u8 = 128;

pub const MIN_COLOR_COUNT: usize = 2;
pub const MAX_COLOR_COUNT: usize = 256;

/// Above this many unique colors median cut is skipped for uniform sampling.
pub const SIMPLE_SAMPLE_THRESHOLD: usize = 10_000;
pub const MEDIAN_CUT_MAX_ITERATIONS: usize = 1000;
pub const MEDIAN_CUT_MIN_SCORE: f64 = 0.1;

pub const MEDIAN_CUT_CHECKPOINT_INTERVAL: usize = 16;
pub const BEST_FIT_CHECKPOINT_INTERVAL: usize = 4096;
pub const MATCH_CHECKPOINT_INTERVAL: usize = 4096;
