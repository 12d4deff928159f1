//! Define the terms subcommand

/// Terms every user of Amazon Location Service agrees to
pub static SERVICE_TERMS_URL: &str = "https://aws.amazon.com/service-terms";

/// Implementation of the `terms` subcommand
pub fn terms_command() -> Result<(), Box<dyn std::error::Error>> {
    println!("Amazon Location Service is subject to the AWS Service Terms:");
    println!("{}", SERVICE_TERMS_URL);
    Ok(())
}
