// Path: crates/execution/src/gas.rs
//! The adaptive block-gas-limit controller.

/// Computes the gas limit governing the next block from this block's
/// limit and usage.
///
/// A damped hyperbolic controller: grow by 10% when the block ran more
/// than 90% full, shrink by 1% when it ran less than 1% full (but not
/// empty), otherwise hold — always clamped to the governance-configured
/// caps.
pub fn next_block_gas_limit(current: u64, used: u64, min_cap: u64, max_cap: u64) -> u64 {
    let upper = current - current / 10;
    let lower = current / 100;

    if used > upper {
        (current + current / 10).min(max_cap)
    } else if used > 0 && used < lower {
        (current - current / 100).max(min_cap)
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: u64 = 1_000;
    const MAX: u64 = 100_000;

    #[test]
    fn nearly_full_block_grows_ten_percent() {
        // 9,500 of 10,000 is above the 90% threshold.
        assert_eq!(next_block_gas_limit(10_000, 9_500, MIN, MAX), 11_000);
    }

    #[test]
    fn nearly_empty_block_shrinks_one_percent() {
        // 50 of 10,000 is below the 1% threshold.
        assert_eq!(next_block_gas_limit(10_000, 50, MIN, MAX), 9_900);
    }

    #[test]
    fn moderate_usage_holds() {
        assert_eq!(next_block_gas_limit(10_000, 5_000, MIN, MAX), 10_000);
    }

    #[test]
    fn empty_block_holds() {
        assert_eq!(next_block_gas_limit(10_000, 0, MIN, MAX), 10_000);
    }

    #[test]
    fn growth_clamps_to_max_cap() {
        assert_eq!(next_block_gas_limit(10_000, 9_999, MIN, 10_500), 10_500);
    }

    #[test]
    fn shrink_clamps_to_min_cap() {
        assert_eq!(next_block_gas_limit(10_000, 5, 9_950, MAX), 9_950);
    }

    #[test]
    fn boundary_values_are_exclusive() {
        // Exactly 90% full is not "more than 90% full".
        assert_eq!(next_block_gas_limit(10_000, 9_000, MIN, MAX), 10_000);
        // Exactly 1% full is not "less than 1% full".
        assert_eq!(next_block_gas_limit(10_000, 100, MIN, MAX), 10_000);
    }
}
