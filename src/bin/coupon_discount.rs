//! # Coupon Discount Function
//!
//! Checkout-time entry point: reads the function input JSON from stdin and
//! writes the discount result JSON to stdout.

use std::io::{self, Read, Write};

use coupon_admin::checkout::{self, RunInput};

fn main() -> anyhow::Result<()> {
    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;

    let input: RunInput = serde_json::from_str(&raw)?;
    let result = checkout::run(&input);

    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, &result)?;
    stdout.flush()?;
    Ok(())
}
