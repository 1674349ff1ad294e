//! `<product-id>=<+n|-n>` arguments for `adjust-stock`

use std::collections::HashMap;

use domain_catalog::StockUpdate;
use eyre::{bail, eyre, Result, WrapErr};
use uuid::Uuid;

/// Parse one `id=+n`, `id=-n` or `id=n` (increment) argument
pub fn parse_adjustment(spec: &str) -> Result<(Uuid, StockUpdate)> {
    let (id, amount) = spec
        .split_once('=')
        .ok_or_else(|| eyre!("expected <product-id>=<+n|-n>, got '{spec}'"))?;

    let id = Uuid::parse_str(id.trim()).wrap_err_with(|| format!("invalid product id in '{spec}'"))?;

    let amount = amount.trim();
    let (increment, digits) = match amount.strip_prefix('-') {
        Some(rest) => (false, rest),
        None => (true, amount.strip_prefix('+').unwrap_or(amount)),
    };

    let quantity: u32 = digits
        .parse()
        .wrap_err_with(|| format!("invalid quantity in '{spec}'"))?;

    Ok((id, StockUpdate { quantity, increment }))
}

/// Parse every argument; the same product may not appear twice
pub fn parse_adjustments(specs: &[String]) -> Result<HashMap<Uuid, StockUpdate>> {
    let mut updates = HashMap::with_capacity(specs.len());
    for spec in specs {
        let (id, update) = parse_adjustment(spec)?;
        if updates.insert(id, update).is_some() {
            bail!("product {id} appears more than once");
        }
    }
    Ok(updates)
}
