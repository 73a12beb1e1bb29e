pub mod physics;
pub mod voxel;
