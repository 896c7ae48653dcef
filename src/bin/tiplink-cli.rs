//! Command-line counterpart of the mobile client: create and read tip
//! pages against a configured backend, falling back to the device-local
//! store when the backend is unreachable or unconfigured.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use url::Url;

use tiplink_node::client::{ClientConfig, TipClient};
use tiplink_node::store::local::LocalStore;
use tiplink_node::store::{PaymentKind, PaymentMethod, TipPageInput, TipPageView};

#[derive(Parser)]
#[command(name = "tiplink-cli", about = "Anonymous tip pages from the terminal")]
struct Cli {
    /// Backend base URL; omit to stay fully on-device
    #[arg(long, env = "TIPLINK_SERVER")]
    server: Option<Url>,

    /// Remote request timeout in seconds
    #[arg(long, default_value_t = 8)]
    timeout_secs: u64,

    /// Directory for the device-local store
    #[arg(long, env = "TIPLINK_LOCAL_DIR", default_value = "tiplink-local")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a tip page and print its token and link
    Create {
        /// Display name shown on the page
        #[arg(long)]
        name: String,

        /// Optional message; a default is used when omitted
        #[arg(long)]
        message: Option<String>,

        #[arg(long, value_name = "ADDRESS")]
        bitcoin: Option<String>,
        #[arg(long, value_name = "ADDRESS")]
        lightning: Option<String>,
        #[arg(long, value_name = "ADDRESS")]
        monero: Option<String>,
        #[arg(long, value_name = "USERNAME")]
        venmo: Option<String>,
        #[arg(long, value_name = "USERNAME")]
        cashapp: Option<String>,
        #[arg(long, value_name = "USERNAME")]
        paypal: Option<String>,
    },
    /// Fetch a tip page by token
    Get { token: String },
    /// Print the shareable link for a token
    Url { token: String },
    /// List links created from this device, newest first
    Links,
    /// Forget a link; the page itself is never deleted
    Forget { token: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = match cli.server {
        Some(url) => ClientConfig::remote(url),
        None => ClientConfig::offline(),
    }
    .with_timeout(Duration::from_secs(cli.timeout_secs));

    let local = LocalStore::open(&cli.data_dir)?;
    let client = TipClient::new(config, local)?;

    match cli.command {
        Command::Create {
            name,
            message,
            bitcoin,
            lightning,
            monero,
            venmo,
            cashapp,
            paypal,
        } => {
            let mut methods = BTreeMap::new();
            if let Some(addr) = bitcoin {
                methods.insert(PaymentKind::Bitcoin, PaymentMethod::address(addr));
            }
            if let Some(addr) = lightning {
                methods.insert(PaymentKind::Lightning, PaymentMethod::address(addr));
            }
            if let Some(addr) = monero {
                methods.insert(PaymentKind::Monero, PaymentMethod::address(addr));
            }
            if let Some(user) = venmo {
                methods.insert(PaymentKind::Venmo, PaymentMethod::username(user));
            }
            if let Some(user) = cashapp {
                methods.insert(PaymentKind::Cashapp, PaymentMethod::username(user));
            }
            if let Some(user) = paypal {
                methods.insert(PaymentKind::Paypal, PaymentMethod::username(user));
            }

            let input = TipPageInput {
                display_name: name,
                message,
                payment_methods: methods,
            };

            let served = client.create_tip_page(input).await?;
            if served.is_local() {
                println!("Tip page created (offline - only resolvable on this device)");
            } else {
                println!("Tip page created");
            }
            let token = served.into_inner();
            println!("Token: {token}");
            println!("{}", client.tip_page_url(&token));
        }

        Command::Get { token } => {
            let served = client.get_tip_page(&token).await?;
            if served.is_local() {
                println!("(served from this device's local store)");
            }
            print_page(served.inner());
        }

        Command::Url { token } => {
            println!("{}", client.tip_page_url(&token));
        }

        Command::Links => {
            let links = client.links()?;
            if links.is_empty() {
                println!("No tip links yet. Create one with `tiplink-cli create`.");
            }
            for link in links {
                println!(
                    "{}  {}  {}",
                    link.created_at.format("%Y-%m-%d %H:%M"),
                    link.token,
                    link.display_name
                );
            }
        }

        Command::Forget { token } => {
            client.remove_link(&token)?;
            println!("Link removed from this device (the page itself still exists)");
        }
    }

    Ok(())
}

fn print_page(page: &TipPageView) {
    println!("{}", page.display_name);
    println!("{}", page.message);
    for (kind, method) in &page.payment_methods {
        let value = method
            .address
            .as_deref()
            .or(method.username.as_deref())
            .unwrap_or("-");
        println!("  {:>9}: {value}", kind.as_str());
    }
}
