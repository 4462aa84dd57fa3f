pub mod money;
pub mod order_number;
