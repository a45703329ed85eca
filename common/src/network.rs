pub mod netblocks;
pub mod range;
pub mod rotation;
