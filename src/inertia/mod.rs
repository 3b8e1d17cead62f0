//! Mass, center of mass and inertia tensor derived from ship voxels

pub mod inertia_data;
pub mod inertia_model;

pub use inertia_data::InertiaData;
pub use inertia_model::InertiaModel;
