pub mod distance;
pub mod facility;
pub mod id_map;
pub mod location;
pub mod matrix;
pub mod orchestrator;
pub mod pruning;
pub mod store;
