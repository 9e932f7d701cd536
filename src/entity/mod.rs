pub mod cart_items;
pub mod carts;
pub mod categories;
pub mod product_categories;
pub mod product_images;
pub mod products;
pub mod wishlist_items;
pub mod wishlists;

pub use cart_items::Entity as CartItems;
pub use carts::Entity as Carts;
pub use categories::Entity as Categories;
pub use product_categories::Entity as ProductCategories;
pub use product_images::Entity as ProductImages;
pub use products::Entity as Products;
pub use wishlist_items::Entity as WishlistItems;
pub use wishlists::Entity as Wishlists;
