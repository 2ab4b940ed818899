//! Subcommand implementation modules

pub mod annotate;
pub mod collapse;
pub mod convert;
pub mod extract;
pub mod insert;
pub mod prune;
pub mod reorder;
pub mod reroot;
pub mod scale;
pub mod split;
pub mod stat;
pub mod tmrca;
pub mod utils;
