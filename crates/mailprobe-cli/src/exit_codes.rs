//! Exit codes for the `mailprobe` binary.
//! Probe failures only affect the exit code under `run --strict`.

pub const SUCCESS: i32 = 0;
pub const CHECK_FAILED: i32 = 1; // --strict run with failing probes, or url-check mismatch
pub const CONFIG_ERROR: i32 = 2; // bad flags, scenario file or service config
pub const SERVICE_ERROR: i32 = 3; // port in use, bind or serve failure
