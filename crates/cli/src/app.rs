use crate::cli::{Cli, Commands};
use crate::json::ErrorJson;
use crate::server::ServerConfig;
use anyhow::Result;
use console::style;
use std::net::SocketAddr;

pub fn run(cli: Cli) -> Result<()> {
    let json = cli.json;
    let keys = cli.keys;

    let result = match cli.command {
        Commands::Serve {
            bind,
            port,
            cors_origin,
        } => crate::server::serve(
            &keys,
            ServerConfig::new(SocketAddr::new(bind, port), cors_origin),
        ),

        Commands::Sign { input, output } => crate::sign::sign_pdf(input, output, &keys, json),

        Commands::Verify {
            input,
            signature,
            signature_file,
        } => crate::commands::verify_pdf(input, signature, signature_file, &keys, json),

        Commands::PublicKey => crate::commands::print_public_key(&keys, json),
    };

    if let Err(e) = &result {
        if json {
            let causes: Vec<String> = e.chain().skip(1).map(|c| c.to_string()).collect();
            let payload = ErrorJson {
                status: "error",
                error: e.to_string(),
                causes,
            };
            println!("{}", serde_json::to_string(&payload)?);
        } else {
            eprintln!("\n{} {}", style("[ERROR]").red().bold(), style(&e).red());

            for (i, cause) in e.chain().skip(1).enumerate() {
                if i == 0 {
                    eprintln!("\n    Caused by:");
                }
                eprintln!("      - {}", style(cause).red());
            }
            eprintln!();
        }
    }

    result
}
