use crate::commands::display::unseal_key;
use crate::commands::{print_info, print_success, Prompter, Session};
use crate::config::NetworkConfig;
use crate::rpc::{create_api, LedgerApi};
use anyhow::{bail, Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use pocketbook_wallet::{
    format_canonical, parse_amount, to_canonical, AddressBook, KeyStore, TransferIntent,
    TransferRequest, TransferResolver, TransferTx,
};
use std::time::Duration;

/// Parse a decimal token amount into canonical units
pub fn parse_canonical_amount(input: &str) -> Result<u64> {
    let value = parse_amount(input)?;
    to_canonical(value).with_context(|| format!("Invalid amount '{}'", input))
}

/// Transfer summary shown before confirmation
pub fn summary_lines(network: &str, intent: &TransferIntent) -> Vec<String> {
    let mut lines = vec![
        format!("Network....: {}", network),
        format!("From.......: {}", intent.from_name),
        format!("Signer(s)..: {}", intent.signer_names.join(",")),
        format!("Destination: {}", intent.destination_label()),
        format!("Amount.....: {}", format_canonical(intent.amount)),
        format!("Fee........: {}", format_canonical(intent.fee)),
    ];

    // the ops breakdown is only interesting for a non-default charge rate
    if intent.charge_rate != 1 {
        lines.push(format!(
            "           : {} ops @ {}",
            intent.required_signatures,
            format_canonical(intent.charge_rate)
        ));
    }

    lines.push(format!(
        "Total......: {} (Amount + Fee)",
        format_canonical(intent.total)
    ));
    lines
}

/// Unseal every signer, sign and submit the transaction, then wait for it to
/// be executed. Returns the transaction digest.
pub async fn submit_transfer(
    prompter: &mut dyn Prompter,
    keys: &KeyStore,
    api: &dyn LedgerApi,
    intent: &TransferIntent,
) -> Result<String> {
    let mut signers = Vec::with_capacity(intent.signer_names.len());
    for name in &intent.signer_names {
        signers.push(unseal_key(prompter, keys, name)?);
    }

    let mut tx = TransferTx::from_intent(intent, &signers)?;
    api.set_validity_period(&mut tx)
        .await
        .context("Failed to set transaction validity period")?;
    for entity in &signers {
        tx.sign(entity)?;
    }
    if !tx.is_fully_signed() {
        bail!("Transaction is missing signatures");
    }

    let digest = api
        .submit_signed_tx(&tx)
        .await
        .context("Failed to submit transaction")?;
    print_info(&format!("TX: 0x{} submitted", digest));

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Waiting for transaction to be confirmed...");
    pb.enable_steady_tick(Duration::from_millis(100));

    let synced = api.sync(&digest).await;
    pb.finish_and_clear();
    synced.with_context(|| format!("Transaction 0x{} was not confirmed", digest))?;

    print_success("Waiting for transaction to be confirmed...complete");
    Ok(digest)
}

pub fn resolve(keys: &KeyStore, book: &AddressBook, request: &TransferRequest) -> Result<TransferIntent> {
    Ok(TransferResolver::new(keys, book).resolve(request)?)
}

pub fn print_explorer_link(network: Option<&NetworkConfig>, digest: &str) {
    if let Some(link) = network.and_then(|n| n.explorer_link(digest)) {
        println!();
        println!("See {} for more details", link.cyan());
    }
}

pub async fn run(session: &Session, prompter: &mut dyn Prompter, request: TransferRequest) -> Result<()> {
    let (keys, book) = session.open_stores()?;
    let intent = resolve(&keys, &book, &request)?;

    println!();
    for line in summary_lines(&session.network, &intent) {
        println!("{}", line);
    }
    println!();

    if !prompter.confirm("Continue with transfer?")? {
        println!("Transfer cancelled.");
        return Ok(());
    }

    let api = create_api(&session.network, &session.config).await?;
    let digest = submit_transfer(prompter, &keys, api.as_ref(), &intent).await?;

    print_explorer_link(session.config.network(&session.network), &digest);
    Ok(())
}
