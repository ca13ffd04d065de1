pub mod user;
pub mod wishlist;
pub mod item;
pub mod share;

pub use user::User;
pub use wishlist::Wishlist;
pub use item::Item;
pub use share::Share;
