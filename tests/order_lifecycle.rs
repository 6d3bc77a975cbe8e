//! End-to-end order lifecycle tests against a real PostgreSQL instance with the schema
//! already applied. Gated behind `DATABASE_URL` the same way the rest of the crate's
//! database-backed tests are.

use sqlx::postgres::PgPoolOptions;
use stustapay_core::account::AccountRepository;
use stustapay_core::order::OrderService;
use stustapay_core::order::{NewLineItemRequest, NewOrder, OrderType};

async fn pool() -> sqlx::PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    PgPoolOptions::new().max_connections(5).connect(&url).await.expect("failed to connect")
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance with the schema applied"]
async fn create_then_book_then_reject_double_confirm() {
    let pool = pool().await;
    let service = OrderService::new(pool);

    let new_order = NewOrder {
        order_type: OrderType::Sale,
        customer_tag_uid: Some(1),
        line_items: vec![NewLineItemRequest { product_id: 1, quantity: 1, price: None }],
        initial_top_up: None,
    };

    let preview = service.create_order(1, 1, new_order).await.expect("create_order should succeed");
    assert!(preview.new_balance <= preview.old_balance);

    service.book_order(preview.id).await.expect("first confirm should succeed");
    let second = service.book_order(preview.id).await;
    assert!(second.is_err(), "confirming an already-finished order must fail");
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance with the schema applied"]
async fn cancel_a_pending_order_leaves_balances_untouched() {
    let pool = pool().await;
    let service = OrderService::new(pool.clone());

    let new_order = NewOrder {
        order_type: OrderType::Sale,
        customer_tag_uid: Some(1),
        line_items: vec![NewLineItemRequest { product_id: 1, quantity: 1, price: None }],
        initial_top_up: None,
    };
    let preview = service.create_order(1, 1, new_order).await.expect("create_order should succeed");

    let account = AccountRepository::get_by_user_tag_uid(&pool, 1)
        .await
        .expect("account lookup should succeed")
        .expect("tag 1 must be bound to a customer account for this test to be meaningful");

    let balance_before = account.balance;

    service.cancel_order(preview.id).await.expect("cancel should succeed");

    let balance_after = AccountRepository::get_by_user_tag_uid(&pool, 1)
        .await
        .expect("account lookup should succeed")
        .expect("account must still exist after cancelling the order")
        .balance;

    assert_eq!(balance_before, balance_after);
}
