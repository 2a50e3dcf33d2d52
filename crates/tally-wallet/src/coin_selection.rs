//! Coin selection.
//!
//! Only spendable UTXOs are considered. The selector first looks for the
//! smallest single UTXO that covers the target plus fee (one input, no
//! fragmentation of large coins). If none exists it accumulates UTXOs
//! largest-first until the target plus the fee for that many inputs is met.
//! The fee is always estimated with a change output included.

use std::cmp::Ordering;

use tally_core::amount::Amount;
use tally_core::types::{FeePolicy, Utxo};

use crate::error::WalletError;

/// Result of coin selection: which UTXOs to spend and the fee/change breakdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinSelection {
    /// Selected UTXOs to spend.
    pub selected: Vec<Utxo>,
    /// Total value of the selected UTXOs.
    pub total_in: Amount,
    /// Fee paid, including any change folded in as dust.
    pub fee: Amount,
    /// Change to return to the wallet; zero when omitted.
    pub change: Amount,
}

/// Sufficient-single, else largest-first, coin selector.
pub struct CoinSelector;

impl CoinSelector {
    /// Select UTXOs to pay `target` to `recipient_outputs` outputs.
    ///
    /// # Arguments
    /// - `utxos`: the wallet's current UTXO set (non-spendable entries are skipped)
    /// - `target`: sum of recipient amounts, excluding fee
    /// - `recipient_outputs`: number of recipient outputs (change is added on top)
    /// - `policy`: fee rate, floor, flat-fee flag and unit scale
    pub fn select(
        utxos: &[Utxo],
        target: Amount,
        recipient_outputs: usize,
        policy: &FeePolicy,
    ) -> Result<CoinSelection, WalletError> {
        if !target.is_positive() {
            return Err(WalletError::Validation("target must be positive".into()));
        }

        let mut candidates: Vec<&Utxo> = utxos
            .iter()
            .filter(|u| u.spendable && u.amount.is_positive())
            .collect();
        if candidates.is_empty() {
            return Err(WalletError::NoUtxos);
        }

        // Largest first; txid/vout keep the order deterministic.
        candidates.sort_by(|a, b| {
            b.amount
                .cmp(&a.amount)
                .then_with(|| a.txid.cmp(&b.txid))
                .then_with(|| a.vout.cmp(&b.vout))
        });

        let outputs_with_change = recipient_outputs + 1;

        // Smallest single UTXO that covers everything.
        let single_need = target + policy.fee(1, outputs_with_change);
        if let Some(single) = candidates
            .iter()
            .rev()
            .find(|u| u.amount.cmp(&single_need) != Ordering::Less)
        {
            return Ok(Self::finish(
                vec![(*single).clone()],
                target,
                outputs_with_change,
                policy,
            ));
        }

        // Greedy accumulation
        let mut selected = Vec::new();
        let mut total_in = Amount::ZERO;
        for utxo in &candidates {
            selected.push((*utxo).clone());
            total_in += utxo.amount;
            let needed = target + policy.fee(selected.len(), outputs_with_change);
            if total_in >= needed {
                return Ok(Self::finish(selected, target, outputs_with_change, policy));
            }
        }

        Err(WalletError::InsufficientFunds {
            have: total_in,
            need: target + policy.fee(selected.len(), outputs_with_change),
        })
    }

    fn finish(
        selected: Vec<Utxo>,
        target: Amount,
        outputs_with_change: usize,
        policy: &FeePolicy,
    ) -> CoinSelection {
        let total_in: Amount = selected.iter().map(|u| u.amount).sum();
        let mut fee = policy.fee(selected.len(), outputs_with_change);
        let mut change = total_in.saturating_sub(target + fee);

        if change < policy.dust_threshold() {
            fee += change;
            change = Amount::ZERO;
        }

        CoinSelection {
            selected,
            total_in,
            fee,
            change,
        }
    }
}
