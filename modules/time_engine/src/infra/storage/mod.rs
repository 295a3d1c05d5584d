pub mod entity;
pub mod mapper;
pub mod memory;
pub mod migrations;
pub mod sea_orm_store;

pub use memory::InMemoryStore;
pub use sea_orm_store::SeaOrmStore;
