//! Application-level orchestration utilities.
//!
//! This module owns run lifecycle control (generate/start/stop) and post-run
//! processing such as result verification and status summaries. UI/CLI layers
//! call into this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{
    drive_controller, run_controller, Controller, UiCommand, MAX_SIZE, MIN_SIZE,
};
#[cfg(test)]
pub(crate) use controller::exploding_sort;
pub(crate) use post_process::process_run_completion;
