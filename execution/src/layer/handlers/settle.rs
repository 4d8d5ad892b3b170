use super::super::*;
use strata_types::{execution::MAX_SETTLEMENTS, Hashlock};

/// Collapse adjacent identical escrows into `(escrow, copies)`.
fn coalesce(swaps: impl Iterator<Item = Swap>) -> Vec<(Swap, u64)> {
    let mut groups: Vec<(Swap, u64)> = Vec::new();
    for swap in swaps {
        match groups.last_mut() {
            Some((last, copies)) if *last == swap => *copies += 1,
            _ => groups.push((swap, 1)),
        }
    }
    groups
}

impl<V: State> Session<'_, V> {
    /// Redeem every live escrow addressed to the sender, then refund every expired escrow it
    /// funded, all under `sha3_256(secret)`.
    ///
    /// Any escrow sharing the hashlock settles in the same call. Identical escrows share one
    /// credit and one delete, since a delete removes every copy. At most [`MAX_SETTLEMENTS`]
    /// distinct escrows are released per call; the rest stay outstanding for a later one.
    pub(in crate::layer) fn handle_swap_settle(
        &mut self,
        sender: &Wallet,
        secret: &[u8],
    ) -> Result<Option<Mutations>> {
        let hashlock = Hashlock::from_secret(secret);
        let now = self.timestamp;

        let redeemable = self
            .scan_swaps(&Filter::SwapsTo {
                receiver: sender.clone(),
                hashlock,
            })?
            .into_iter()
            .filter(|swap| swap.is_redeemable(now));
        let refundable = self
            .scan_swaps(&Filter::SwapsFrom {
                sender: sender.clone(),
                hashlock,
            })?
            .into_iter()
            .filter(|swap| swap.is_refundable(now));
        let eligible = coalesce(redeemable.chain(refundable));
        let deferred = eligible.len().saturating_sub(MAX_SETTLEMENTS);

        // Redeems credit the receiver and refunds the sender; both are the caller.
        let mut mutations = Vec::new();
        for (swap, copies) in eligible.into_iter().take(MAX_SETTLEMENTS) {
            let Some(amount) = swap.amount.checked_mul(copies) else {
                return Ok(None);
            };
            let Some(credit) = self.credit(sender, amount)? else {
                return Ok(None);
            };
            mutations.push(credit);
            mutations.push(Mutation::Delete(Row::Swap(swap)));
        }

        debug!(
            sender = ?sender,
            %hashlock,
            timestamp = now,
            settled = mutations.len() / 2,
            deferred,
            "settled swaps"
        );
        Ok(Some(mutations.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::swap;

    #[test]
    fn test_coalesce_groups_adjacent_copies() {
        let hashlock = Hashlock::from_secret(b"H");
        let a = swap(1, 2, 10, 50, hashlock);
        let b = swap(3, 2, 10, 50, hashlock);
        let groups = coalesce(vec![a.clone(), a.clone(), b.clone(), a.clone()].into_iter());
        assert_eq!(groups, vec![(a.clone(), 2), (b, 1), (a, 1)]);
        assert!(coalesce(std::iter::empty()).is_empty());
    }
}
