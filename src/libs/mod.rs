pub mod metadata;
pub mod phylo;
