pub mod cart;
pub mod checkout;
pub mod coupon;
pub mod order;
pub mod shipment;

pub use cart::{Address, CartItemRequest, CartLine, CustomerInfo};
pub use checkout::{CheckoutResponse, CreateCheckoutRequest};
pub use coupon::{CouponKind, ValidateCouponRequest, ValidateCouponResponse};
pub use order::{FulfillmentStatus, PaymentStatus};
pub use shipment::{ShipmentAck, ShipmentNotification};
