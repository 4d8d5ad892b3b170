use super::super::*;
use strata_types::Hashlock;

impl<V: State> Session<'_, V> {
    /// Escrow `amount` from the sender. A wallet with no balance row holds zero.
    pub(in crate::layer) fn handle_swap_initiate(
        &mut self,
        sender: &Wallet,
        receiver: &Wallet,
        amount: u64,
        expiration: u64,
        hashlock: Hashlock,
    ) -> Result<Option<Mutations>> {
        let previous = self.balance(sender)?;
        let available = previous.unwrap_or(0);
        if available < amount {
            return Ok(None);
        }
        let debit = self.set_balance(sender, previous, available - amount);
        let escrow = Mutation::Insert(Row::Swap(Swap {
            sender: sender.clone(),
            receiver: receiver.clone(),
            amount,
            expiration,
            hashlock,
        }));
        Ok(Some((debit, escrow).into()))
    }
}
