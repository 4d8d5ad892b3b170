use super::super::*;
use strata_types::Vote;

impl<V: State> Session<'_, V> {
    pub(in crate::layer) fn handle_vote(
        &mut self,
        sender: &Wallet,
        policy: &str,
        choice: &str,
    ) -> Option<Mutations> {
        let vote = Vote {
            wallet: sender.clone(),
            policy: policy.to_string(),
            choice: choice.to_string(),
        };
        Some(Mutation::Insert(Row::Vote(vote)).into())
    }
}
