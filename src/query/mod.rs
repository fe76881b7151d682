pub mod chapters;
pub mod cluster;
pub mod dependencies;
pub mod find;
pub mod narrative;
pub mod output;
pub mod stats;
