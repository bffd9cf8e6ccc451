pub mod cart_line;
pub mod customer;
pub mod customer_address;
pub mod id_sequence;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_image;

pub use cart_line::{Entity as CartLine, Model as CartLineModel};
pub use customer::{Entity as Customer, Model as CustomerModel};
pub use customer_address::{Entity as CustomerAddress, Model as CustomerAddressModel};
pub use id_sequence::{Entity as IdSequence, Model as IdSequenceModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel, ProductStatus};
pub use product_image::{Entity as ProductImage, Model as ProductImageModel};
