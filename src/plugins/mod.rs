pub mod core;
pub mod navigation;
pub mod physics;
pub mod saveload;
pub mod scenario;
