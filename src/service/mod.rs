//! # Behavior Controllers and Features
//!
//! - **Controller**: the shared controller contract and plumbing
//! - **Mimic**: copies another avatar
//! - **Wardrobe**: outfit import and figure extraction

pub mod controller;
pub mod mimic;
pub mod wardrobe;

pub use controller::{Controller, ControllerBase, ControllerStatus};
pub use mimic::{Mimic, MimicConfig, MimicOption, MimicState};
pub use wardrobe::{extract_figures, import_wardrobe, wear_outfit, Outfit};
