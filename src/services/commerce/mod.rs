/// Commerce services module - cart and checkout
pub mod cart_service;
pub mod checkout_service;

// Re-export services for convenience
pub use cart_service::{AddToCartInput, CartLineView, CartService, CartView, UpdateQuantityInput};
pub use checkout_service::{
    CheckoutRequest, CheckoutService, OrderItemView, OrderWithItems, PaymentMethod,
};
