//! LoomQL CLI
//!
//! Command-line interface for assembling and serving LoomQL GraphQL services.

use loomql_core::ResolverRegistry;

#[tokio::main]
async fn main() {
    if let Err(e) = loomql_cli::run_with_registry(ResolverRegistry::new()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
