//! `parsec tools`: Print the tool definitions sent to every provider.

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(&parsec_tools::definitions())?;
    println!("{json}");
    Ok(())
}
