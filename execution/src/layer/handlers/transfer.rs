use super::super::*;

impl<V: State> Session<'_, V> {
    pub(in crate::layer) fn handle_transfer(
        &mut self,
        sender: &Wallet,
        receiver: &Wallet,
        amount: u64,
    ) -> Result<Option<Mutations>> {
        let Some(available) = self.balance(sender)? else {
            return Ok(None);
        };
        if available < amount {
            return Ok(None);
        }
        let debit = self.set_balance(sender, Some(available), available - amount);

        // Read after the debit so a self-transfer nets out.
        let Some(credit) = self.credit(receiver, amount)? else {
            return Ok(None);
        };
        Ok(Some((debit, credit).into()))
    }
}
