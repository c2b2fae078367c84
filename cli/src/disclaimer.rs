use crate::commands::Prompter;
use anyhow::Result;
use colored::*;
use std::path::Path;

pub const DISCLAIMER: &str = "
                                == Warning ==

You use this application at your own risk. Whilst every effort has been made
to ensure its reliability and security, it comes with no warranty. It is
intended for the creation and management of wallets and transactions between
them. You are responsible for the security of your own private keys (see the
key store folder). Do not use this application for high-value operations: it
is intended for utility operations on the main network.
";

/// Show the disclaimer on first run, when the key store root does not exist
/// yet. Returns whether it was shown.
pub fn display_disclaimer(root: &Path, prompter: &mut dyn Prompter) -> Result<bool> {
    if root.is_dir() {
        return Ok(false);
    }

    println!("{}", DISCLAIMER.yellow());
    prompter.input("Press enter to accept")?;
    Ok(true)
}
