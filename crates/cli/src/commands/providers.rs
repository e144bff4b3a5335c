//! `parsec providers`: List implemented LLM providers.

use parsec_providers::ProviderKind;

pub fn run() {
    println!("Implemented providers");
    println!("=====================");
    println!();
    println!("  {:<12} {}", "Provider", "Default model");
    for kind in ProviderKind::ALL {
        println!("  {:<12} {}", kind.as_str(), kind.default_model());
    }
    println!();
    println!("  Endpoint overrides (proxies, gateways):");
    println!("    [providers.openai]");
    println!("    base_url = \"https://your-proxy.example.com\"");
}
