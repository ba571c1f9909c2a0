//! Client-state stores.
//!
//! Each store is an explicit, independently constructed state holder:
//! collaborators arrive through the constructor, never through ambient
//! lookup. All handles are cheap clones over shared inner state.

pub mod cart;
pub mod favorites;
pub mod session;

pub use cart::{CartItem, CartStore};
pub use favorites::FavoritesStore;
pub use session::{AdminSessionStore, AuthError, CustomerSessionStore};
