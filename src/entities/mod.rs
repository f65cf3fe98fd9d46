//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod advertisement;
pub mod payment;
pub mod user;
pub mod vehicle;

// Re-export specific types to avoid conflicts
pub use advertisement::{
    Column as AdvertisementColumn, Entity as Advertisement, Model as AdvertisementModel,
};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use vehicle::{Column as VehicleColumn, Entity as Vehicle, Model as VehicleModel};
