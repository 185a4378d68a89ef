pub mod apply;
pub mod pruning;
pub mod reconstruct;
