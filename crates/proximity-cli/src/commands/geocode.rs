use proximity_core::Geocoder;

pub async fn run(address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let geocoder = super::load_config().geocoder()?;
    let candidates = geocoder.lookup(address).await?;
    println!("{}", serde_json::to_string_pretty(&candidates)?);
    Ok(())
}
