//! Common functionality for EMPIRE, a stochastic capacity-expansion model for multi-node energy
//! systems.
#![warn(missing_docs)]
use dirs::config_dir;
use std::path::PathBuf;

pub mod capacity;
pub mod cli;
pub mod demand_response;
pub mod derivation;
pub mod finance;
pub mod generator;
pub mod heat;
pub mod horizon;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod network;
pub mod optimisation;
pub mod output;
pub mod settings;
pub mod storage;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program-wide configuration files are stored
pub fn get_empire_config_dir() -> PathBuf {
    let Some(mut dir) = config_dir() else {
        // No config dir for this platform; fall back to the current directory
        return PathBuf::new();
    };
    dir.push("empire");

    dir
}
