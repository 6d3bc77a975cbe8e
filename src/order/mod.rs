mod booker;
mod service;
mod types;

pub use booker::{book_order, book_order_in_tx, NewBookedOrder};
pub use service::OrderService;
pub use types::{
    BookingKey, BookingMap, CompletedOrder, LineItem, NewLineItem, NewLineItemRequest, NewOrder,
    Order, OrderInfo, OrderStatus, OrderType,
};
