//! Audit logging example.
//!
//! This example shows how to:
//! - Build a configuration from environment variables
//! - Log an event to the audit service
//! - Search the log for it
//!
//! Run with:
//! PANGEA_TOKEN=... PANGEA_DOMAIN=aws.us.pangea.cloud cargo run --example audit_log

use pangea::prelude::*;
use pangea::services::audit::{Event, SearchInput, SearchOrder};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("pangea=debug")),
        )
        .init();

    let token = std::env::var("PANGEA_TOKEN")?;
    let domain = std::env::var("PANGEA_DOMAIN")?;
    let overrides = match std::env::var("PANGEA_AUDIT_CONFIG_ID") {
        Ok(config_id) => ConfigOverrides::new().with_config_id(config_id),
        Err(_) => ConfigOverrides::new(),
    };
    let config = Configuration::with_overrides(token, domain, &overrides)?;

    let audit = Audit::new(config)?;
    let ctx = CallContext::new().with_timeout(Duration::from_secs(30));

    let event = Event::new("Hello, World!")
        .with_actor("pangea-demo")
        .with_action("demo")
        .with_status("success");

    println!("Logging: {:?}", event.message);
    let logged = audit.log(&ctx, &event, true, true).await?;
    println!("Request ID: {}", logged.request_id);
    if let Some(hash) = &logged.result.hash {
        println!("Hash: {}", hash);
    }

    let search = SearchInput::new("message:\"Hello, World!\"")
        .with_order(SearchOrder::Desc, "received_at")
        .with_limit(5);
    let found = audit.search(&ctx, &search).await?;

    println!("\nFound {} event(s):", found.result.count);
    for event in &found.result.events {
        let received = event
            .envelope
            .received_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!("  [{}] {}", received, event.envelope.event.message);
    }

    Ok(())
}
