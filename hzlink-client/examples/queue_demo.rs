//! Queue round trip against a running member.
//!
//! Run with: `cargo run --example queue_demo`
//!
//! Connects to `HZ_ADDRESS` (default `127.0.0.1:5701`), puts a message on a
//! queue, polls it back and keeps the connection alive with heartbeats for a
//! few seconds before shutting down.

use std::time::Duration;

use hzlink_client::{ClientConfig, HzClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,hzlink_client=debug".into()),
        )
        .init();

    let config = ClientConfig::from_env()?;
    println!("Connecting to {}...", config.address());

    let client = HzClient::connect(config).await?;
    println!(
        "Connected to {} ({} partitions)\n",
        client.connection().address(),
        client.partition_table().partition_count()
    );

    let queue = client.get_queue("myqueue").await?;

    queue.put(b"Hello World").await?;
    println!("Put 'Hello World' on {}", queue.name());

    match queue.poll(Duration::from_secs(10)).await? {
        Some(item) => println!("Received message: {}", String::from_utf8_lossy(&item)),
        None => println!("Queue was empty"),
    }

    queue.destroy().await?;

    println!("\nIdling for 20s while heartbeats run...");
    tokio::time::sleep(Duration::from_secs(20)).await;

    client.shutdown().await;
    println!("Done");
    Ok(())
}
