//! near-selector: headless guestbook driven through the NEAR wallet selector

use eyre::{bail, WrapErr};

use near_selector::{App, PanelState};
use near_selector_adapters::{SelectorConfig, WALLET_CONNECT_ID};
use near_selector_core::format_near_amount;

const USAGE: &str = "usage: near-selector [messages | sign-in | post <text> [donation] | sign-out | events]";

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = SelectorConfig::from_env();
    tracing::info!(network = %config.network_id, contract = %config.contract_id, "Starting near-selector");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start tokio runtime")?;

    let app = App::from_config(config)?;
    let panel = app.panel();
    runtime
        .block_on(panel.mount())
        .wrap_err("failed to load guestbook")?;

    match args.first().map(String::as_str) {
        None | Some("messages") => {}
        Some("sign-in") => {
            let accounts = app.selector().sign_in(WALLET_CONNECT_ID)?;
            for account in &accounts {
                println!("signed in as {}", account.account_id);
            }
        }
        Some("post") => {
            let Some(text) = args.get(1) else {
                bail!(USAGE);
            };
            let donation = args.get(2).map(String::as_str).unwrap_or("");
            let result = panel.submit(text, donation);
            for alert in panel.take_alerts()? {
                eprintln!("{alert}");
            }
            result?;
        }
        Some("sign-out") => panel.sign_out(),
        Some("events") => {
            let handled = app.poll_bridge_events()?;
            println!("handled {handled} bridge events");
        }
        Some(other) => bail!("unknown command {other:?}\n{USAGE}"),
    }

    print_state(&panel.snapshot()?);
    panel.unmount()?;
    Ok(())
}

fn print_state(state: &PanelState) {
    match (&state.account_id, &state.account) {
        (Some(id), Some(view)) => {
            let balance = format_near_amount(&view.amount, 2).unwrap_or_else(|| view.amount.clone());
            println!("account: {id} ({balance} NEAR)");
        }
        (Some(id), None) => println!("account: {id}"),
        _ => println!("not signed in"),
    }
    println!("{} messages", state.messages.len());
    for message in &state.messages {
        let marker = if message.premium { "*" } else { " " };
        println!("{marker} {}: {}", message.sender, message.text);
    }
}
