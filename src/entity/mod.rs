pub mod inventory_items;
pub mod order_lines;
pub mod orders;
pub mod payments;
pub mod shops;
pub mod users;

pub use inventory_items::Entity as InventoryItems;
pub use order_lines::Entity as OrderLines;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use shops::Entity as Shops;
pub use users::Entity as Users;
