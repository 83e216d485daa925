pub mod chat;
pub mod identity;
pub mod message;
pub mod order;
pub mod product;
pub mod resource;
pub mod storefront;
