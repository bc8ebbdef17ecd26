pub mod core;
pub mod records;

pub use self::core::ModelStore;
