// Play configuration: offsets, clock tolerances, judgment/score/life tables, key bindings

mod play_config;

pub use play_config::{
    INPUT_FUTURE_TOLERANCE_MAX, INPUT_FUTURE_TOLERANCE_MIN, OFFSET_MAX, OFFSET_MIN, PlayConfig,
    STALL_THRESHOLD_MAX, STALL_THRESHOLD_MIN,
};
