//! Check command implementation.

use crate::script::{self, Op};
use std::path::Path;

/// Runs the check command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let ops = script::load(path)?;
    let total: usize = ops.iter().map(Op::weight).sum();
    let transactions = count_transactions(&ops);

    println!("Script: {}", path.display());
    println!("  Top-level operations: {}", ops.len());
    println!("  Total operations: {total}");
    println!("  Transactions: {transactions}");
    println!("OK");

    Ok(())
}

fn count_transactions(ops: &[Op]) -> usize {
    ops.iter()
        .map(|op| match op {
            Op::Transaction { ops } => 1 + count_transactions(ops),
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_transactions_are_counted() {
        let ops = script::parse(
            r#"[
                {"op": "transaction", "ops": [
                    {"op": "transaction", "ops": [{"op": "remove"}]}
                ]},
                {"op": "remove"}
            ]"#,
        )
        .unwrap();
        assert_eq!(count_transactions(&ops), 2);
    }
}
