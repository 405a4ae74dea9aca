//! 菜单目录
//!
//! - [`Catalog`] - categories and menu items
//! - [`AddonConflictGraph`] - add-ons and their symmetric conflict edges
//! - [`IdentifierAllocator`] - prefixed menu item ids

mod addons;
mod ids;
mod menu;

pub use addons::AddonConflictGraph;
pub use ids::IdentifierAllocator;
pub use menu::Catalog;
