//! Tome Greet - Greeting lewat boundary native
//!
//! Setiap nama di-copy ke alokasi `malloc`, diserahkan ke `tome_greet`,
//! hasilnya dibaca lalu kedua alokasi dilepas.
//!
//! Usage:
//!   cargo run --release --bin tome_greet -- World GO

use clap::Parser;
use tracing_subscriber::EnvFilter;

use tome::ffi::greet_native;

/// Greeter configuration
#[derive(Debug, Parser)]
#[command(author, version, about = "Greet names through the native string boundary")]
struct GreetConfig {
    /// Names to greet
    #[arg(default_value = "World")]
    names: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = GreetConfig::parse();

    for name in &config.names {
        match greet_native(name) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("❌ Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
