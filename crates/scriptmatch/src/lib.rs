//! Command-line front end and service-facing pipeline for the scriptmatch
//! comparison engine.

pub mod cli;
pub mod pipeline;
pub mod report;
pub mod settings;
