//! Transaction builder.
//!
//! Turns recipients plus the wallet's UTXO set into the input/output lists
//! handed to `createrawtransaction`:
//! 1. Add recipients (validated on insert)
//! 2. Fund the transaction (coin selection, fee, change)
//! 3. Read back inputs and outputs

use tally_core::amount::Amount;
use tally_core::types::{FeePolicy, Recipient, TxInput, TxOutput, Utxo};
use tracing::{debug, warn};

use crate::coin_selection::CoinSelector;
use crate::error::WalletError;

/// Builder for funded, unsigned transactions.
///
/// # Example
/// ```ignore
/// let mut builder = TransactionBuilder::new(coin.fee_policy());
/// builder.add_recipient(Recipient::new(addr, amount));
/// builder.fund_transaction(&utxos, None)?;
/// let raw = rpc.create_raw_transaction(&builder.get_inputs(), builder.get_tx_outputs()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct TransactionBuilder {
    policy: FeePolicy,
    recipients: Vec<Recipient>,
    rejected: usize,
    inputs: Vec<Utxo>,
    outputs: Vec<TxOutput>,
    fee: Amount,
    change: Amount,
}

impl TransactionBuilder {
    pub fn new(policy: FeePolicy) -> Self {
        Self {
            policy,
            recipients: Vec::new(),
            rejected: 0,
            inputs: Vec::new(),
            outputs: Vec::new(),
            fee: Amount::ZERO,
            change: Amount::ZERO,
        }
    }

    /// Add a recipient.
    ///
    /// A malformed recipient (empty address, non-positive amount, or more
    /// precision than one base unit) is not added; the builder is flagged
    /// invalid instead.
    pub fn add_recipient(&mut self, recipient: Recipient) -> &mut Self {
        let representable = recipient.amount.to_units(self.policy.unit_scale).is_some();
        if !recipient.is_valid() || !representable {
            warn!(
                address = %recipient.address,
                amount = %recipient.amount,
                "rejected recipient"
            );
            self.rejected += 1;
            return self;
        }
        self.recipients.push(recipient);
        self
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    /// Select inputs from `utxos` and lay out the outputs.
    ///
    /// Change goes to `change_address`, or to the first selected input's
    /// address when none is given. Change below the dust threshold is left
    /// to the fee.
    pub fn fund_transaction(
        &mut self,
        utxos: &[Utxo],
        change_address: Option<&str>,
    ) -> Result<(), WalletError> {
        if self.rejected > 0 {
            return Err(WalletError::Validation(format!(
                "{} malformed recipient(s)",
                self.rejected
            )));
        }
        if self.recipients.is_empty() {
            return Err(WalletError::Validation("no recipients".into()));
        }

        let mut outputs: Vec<TxOutput> = Vec::with_capacity(self.recipients.len() + 1);
        for r in &self.recipients {
            push_merged(&mut outputs, &r.address, r.amount);
        }
        let target: Amount = outputs.iter().map(|o| o.amount).sum();

        let selection = CoinSelector::select(utxos, target, outputs.len(), &self.policy)?;

        if selection.change.is_positive() {
            let address = change_address
                .filter(|a| !a.trim().is_empty())
                .map(str::to_string)
                .or_else(|| {
                    selection
                        .selected
                        .first()
                        .map(|u| u.address.clone())
                        .filter(|a| !a.is_empty())
                })
                .ok_or_else(|| WalletError::Validation("no change address".into()))?;
            push_merged(&mut outputs, &address, selection.change);
        }

        debug!(
            inputs = selection.selected.len(),
            outputs = outputs.len(),
            fee = %selection.fee,
            change = %selection.change,
            "funded transaction"
        );

        self.inputs = selection.selected;
        self.outputs = outputs;
        self.fee = selection.fee;
        self.change = selection.change;
        Ok(())
    }

    /// At least one input and one output, no rejected recipients, and
    /// inputs cover outputs plus fee.
    pub fn is_valid(&self) -> bool {
        if self.rejected > 0 || self.inputs.is_empty() || self.outputs.is_empty() {
            return false;
        }
        let total_in: Amount = self.inputs.iter().map(|u| u.amount).sum();
        let total_out: Amount = self.outputs.iter().map(|o| o.amount).sum();
        total_in >= total_out + self.fee
    }

    /// Outpoints to spend.
    pub fn get_inputs(&self) -> Vec<TxInput> {
        self.inputs
            .iter()
            .map(|u| TxInput {
                txid: u.txid.clone(),
                vout: u.vout,
            })
            .collect()
    }

    /// UTXOs selected by the last successful funding.
    pub fn selected_utxos(&self) -> &[Utxo] {
        &self.inputs
    }

    /// Recipient outputs followed by the change output, if any.
    pub fn get_tx_outputs(&self) -> &[TxOutput] {
        &self.outputs
    }

    pub fn fee(&self) -> Amount {
        self.fee
    }

    pub fn change(&self) -> Amount {
        self.change
    }
}

impl Default for TransactionBuilder {
    fn default() -> Self {
        Self::new(FeePolicy::default())
    }
}

fn push_merged(outputs: &mut Vec<TxOutput>, address: &str, amount: Amount) {
    match outputs.iter_mut().find(|o| o.address == address) {
        Some(existing) => existing.amount += amount,
        None => outputs.push(TxOutput {
            address: address.to_string(),
            amount,
        }),
    }
}
