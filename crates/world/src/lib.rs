//! AnimaLoom world model.
//!
//! Hosts the entities formulas evaluate against: the [`Eidolon`] agent
//! model with its four attribute tiers, the explicit [`World`] registry
//! (constructed where needed; never a global), the [`EidolonView`] adapter
//! that exposes an eidolon to the formula engine, and the TOML content
//! loaders for characters and formula packs.

pub mod eidolon;
pub mod error;
pub mod loader;
pub mod view;
pub mod world;

pub use eidolon::{base_schema, AttributeValue, Eidolon};
pub use error::{Result, WorldError};
pub use loader::{
    characters_from_str, formulas_from_str, load_characters, load_formulas, LoadReport,
};
pub use view::EidolonView;
pub use world::World;
