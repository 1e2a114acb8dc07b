//! Compute a proof by hand.

use anyhow::{Context, Result};
use base64::Engine;
use burrow_types::{compute_proof, Challenge, BASE64};

/// Run the proof command.
pub fn run(secret: &str, challenge: &str) -> Result<()> {
    println!("{}", proof_for(secret, challenge)?);
    Ok(())
}

fn proof_for(secret: &str, challenge: &str) -> Result<String> {
    let challenge = Challenge::from_base64(challenge.trim()).context("Invalid challenge")?;
    Ok(BASE64.encode(compute_proof(secret.as_bytes(), &challenge)))
}
