pub mod auth;
pub mod wishlists;
pub mod items;
pub mod public;
