mod lifecycle;
mod spread;

pub use lifecycle::{GrowthSystem, LifecycleSystem};
pub use spread::SpreadSystem;
