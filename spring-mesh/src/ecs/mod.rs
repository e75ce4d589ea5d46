//! Entity store
//!
//! This module provides the masses, springs and the world that owns them:
//! - Stable entity handles and status flags
//! - Tombstoning arena storage
//! - Cascading deletion, duplication and bulk merge
//! - Picking and selection edits
//! - Force accumulation over the stored entities

mod entity;
mod component;
mod world;
mod selection;

/// Mass and spring definitions
pub mod components;

/// Force accumulation
pub mod systems;

pub use entity::{MassId, SpringId, Status};
pub use component::{Arena, Component};
pub use selection::Picked;
pub use world::{
    Duplication, EntityBatch, IdMap, MergeReport, Snapshot, SpringRecord, World, FAKE_MASS,
    FAKE_SPRING,
};
