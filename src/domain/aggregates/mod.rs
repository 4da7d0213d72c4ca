//! Aggregates module
pub mod product;
pub mod review;
pub mod order;
pub mod collection;
pub mod favorite;

pub use product::{Product, ProductChanges, ProductError};
pub use review::{ProductReview, ReviewError};
pub use order::{Order, OrderError, OrderLine, OrderStatus};
pub use collection::{Collection, CollectionError, Member};
pub use favorite::{Favorite, FavoriteError};
