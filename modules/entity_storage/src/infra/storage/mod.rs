//! Storage layer - SeaORM gateway and schema registry

pub mod gateway;
pub mod registry;

pub use gateway::SeaOrmEntityStorage;
pub use registry::EntityRegistry;
