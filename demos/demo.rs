//! Order pipeline demo showing happy and unhappy paths.
//!
//! Run with: cargo run --example demo

use std::sync::atomic::{AtomicU32, Ordering};

use retrace::{Chain, ChainError, Outcome};

// Track payment attempts across retries for the demo.
static PAYMENT_ATTEMPTS: AtomicU32 = AtomicU32::new(0);

fn charge_payment(order_id: String) -> Outcome<(String, String)> {
    let attempt = PAYMENT_ATTEMPTS.fetch_add(1, Ordering::SeqCst) + 1;
    println!("  [payment] attempt {attempt} for {order_id}...");

    // First two attempts hit a gateway timeout.
    if attempt < 3 {
        println!("  [payment] transient failure, gateway timeout");
        return Outcome::Failure(ChainError::msg("gateway timeout"));
    }

    let payment_id = format!("PAY-{order_id}");
    println!("  [payment] charged: {payment_id}");
    Outcome::Success((order_id, payment_id))
}

fn main() {
    println!("=== Scenario 1: transient payment failure, recovered by retry ===\n");
    run_retry_scenario();

    println!("\n=== Scenario 2: permanent failure, pipeline rolled back ===\n");
    run_undo_scenario();
}

fn run_retry_scenario() {
    PAYMENT_ATTEMPTS.store(0, Ordering::SeqCst);

    let chain = Chain::run(|| {
        println!("  [order] creating order for CUST-123");
        Outcome::Success("ORD-123".to_string())
    })
    .then(
        |order_id| {
            println!("  [inventory] reserving stock for {order_id}");
            Outcome::Success(order_id)
        },
        |order_id| println!("  [inventory] UNDO - releasing stock for {order_id}"),
    )
    .try_map(charge_payment);

    // Only the payment step is re-run; order creation and the inventory
    // reservation already committed.
    let settled = chain.retry_if(5, |e| *e == ChainError::msg("gateway timeout"));

    match settled.outcome() {
        Outcome::Success((order_id, payment_id)) => {
            println!("\n  order {order_id} settled with {payment_id}");
        }
        Outcome::Failure(e) => println!("\n  pipeline failed: {e}"),
    }
}

fn run_undo_scenario() {
    let chain = Chain::run(|| {
        println!("  [order] creating order for CUST-456");
        Outcome::Success("ORD-456".to_string())
    })
    .then(
        |order_id| {
            println!("  [inventory] reserving stock for {order_id}");
            Outcome::Success(order_id)
        },
        |order_id| println!("  [inventory] UNDO - releasing stock for {order_id}"),
    )
    .then(
        |order_id| {
            println!("  [payment] card declined for {order_id}");
            Outcome::<String>::Failure(ChainError::msg("card declined"))
        },
        |payment_id| println!("  [payment] UNDO - refunding {payment_id}"),
    );

    if chain.failed() {
        println!("\n  pipeline failed ({}), rolling back...", chain.error());
        chain.undo();
        println!("  rollback complete; context reads now fail: {}", chain.error());
    }
}
