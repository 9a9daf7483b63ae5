//! IP reputation example.
//!
//! Run with:
//! PANGEA_TOKEN=... PANGEA_DOMAIN=aws.us.pangea.cloud cargo run --example ip_lookup -- 93.231.182.110

use pangea::prelude::*;
use pangea::services::ip_intel::IpLookupInput;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let ip = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "93.231.182.110".to_string());

    let config = Configuration::new(
        std::env::var("PANGEA_TOKEN")?,
        std::env::var("PANGEA_DOMAIN")?,
    )?;
    let intel = IpIntel::new(config)?;

    let input = IpLookupInput::new(&ip).with_provider("crowdstrike");
    match intel.lookup(&CallContext::new(), &input).await {
        Ok(response) => {
            let data = &response.result.data;
            println!("{}: {} (score {})", ip, data.verdict, data.score);
            if !data.category.is_empty() {
                println!("Categories: {}", data.category.join(", "));
            }
        }
        Err(PangeaError::Api(err)) => {
            eprintln!("{}", err.message);
            for field in &err.errors {
                eprintln!("  {} {}: {}", field.source, field.code, field.detail);
            }
        }
        Err(err) => return Err(err.into()),
    }

    Ok(())
}
