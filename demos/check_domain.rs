use subreg_sdk_rs::{SubregClient, SubregEnvironment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let username = std::env::var("SUBREG_USER")?;
    let password = std::env::var("SUBREG_PASSWORD")?;

    // Log in against the operational test environment
    println!("Logging in to subreg OTE as {}...", username);
    let mut client =
        SubregClient::with_credentials(SubregEnvironment::Ote, &username, &password).await?;

    let domain = std::env::args().nth(1).unwrap_or_else(|| "example.cz".to_string());
    println!("\nChecking availability of {}", domain);

    match client.check_domain_available(&domain).await {
        Ok(true) => println!("✓ {} is available", domain),
        Ok(false) => println!("✗ {} is taken", domain),
        Err(e) => eprintln!("✗ Check failed: {}", e),
    }

    println!("\nAccount credit:");
    match client.get_credit().await {
        Ok(credit) => println!("{}", serde_json::to_string_pretty(&credit)?),
        Err(e) => eprintln!("✗ Credit query failed: {}", e),
    }

    Ok(())
}
