use crate::errors::ExtractError;
use score_core::{
    AttributedScore, EventSink, FinalizedResult, Legend, Player, RawObservation, RegistryEvent,
    Score,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Scores observed for one legend, in capture order.
#[derive(Clone, Debug)]
struct LegendGroup {
    legend: Legend,
    scores: Vec<Score>,
}

/// Known accounts and players, live legend assignments, account bindings,
/// and the current round's observations.
pub struct IdentityRegistry {
    sink: Arc<dyn EventSink>,
    players: BTreeMap<String, Player>,
    accounts: BTreeSet<String>,
    /// Player name -> legend currently played.
    live: BTreeMap<String, Legend>,
    /// Account -> player name.
    bindings: BTreeMap<String, String>,

    // Round-scoped, rebuilt on every batch.
    groups: Vec<LegendGroup>,
    /// Account -> (legend, 1-based position within the legend's group).
    positions: HashMap<String, (Legend, usize)>,
}

impl IdentityRegistry {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            players: BTreeMap::new(),
            accounts: BTreeSet::new(),
            live: BTreeMap::new(),
            bindings: BTreeMap::new(),
            groups: Vec::new(),
            positions: HashMap::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Accounts and players
    // ---------------------------------------------------------------------

    /// Returns false if the account was already known.
    pub fn add_account(&mut self, name: &str) -> bool {
        if !self.accounts.insert(name.to_string()) {
            return false;
        }
        self.notify_accounts();
        true
    }

    pub fn remove_account(&mut self, name: &str) -> bool {
        if !self.accounts.remove(name) {
            return false;
        }
        self.notify_accounts();
        true
    }

    /// Returns false if a player with that name already exists.
    pub fn add_player(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.name) {
            return false;
        }
        self.players.insert(player.name.clone(), player);
        self.notify_players();
        true
    }

    /// Removes the player along with its live assignment and bindings.
    pub fn remove_player(&mut self, name: &str) -> bool {
        if self.players.remove(name).is_none() {
            return false;
        }
        if self.live.remove(name).is_some() {
            self.notify_live();
        }
        if self.unbind_player(name) {
            self.notify_bindings();
        }
        self.notify_players();
        true
    }

    pub fn has_player(&self, name: &str) -> bool {
        self.players.contains_key(name)
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.accounts.contains(name)
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Sorted account names.
    pub fn accounts(&self) -> Vec<String> {
        self.accounts.iter().cloned().collect()
    }

    // ---------------------------------------------------------------------
    // Live assignments and bindings
    // ---------------------------------------------------------------------

    /// Set the legend a player is playing. An empty legend clears the
    /// assignment and unbinds every account bound to the player.
    ///
    /// Returns false for unknown players.
    pub fn set_live_assignment(&mut self, player: &str, legend: Legend) -> bool {
        if !self.players.contains_key(player) {
            return false;
        }

        if legend.is_empty() {
            self.live.remove(player);
            if self.unbind_player(player) {
                self.notify_bindings();
            }
        } else {
            self.live.insert(player.to_string(), legend);
        }

        self.notify_live();
        true
    }

    pub fn live_legend(&self, player: &str) -> Option<&Legend> {
        self.live.get(player)
    }

    pub fn live_assignments(&self) -> &BTreeMap<String, Legend> {
        &self.live
    }

    /// Bind `account` to `player`, replacing any account the player already
    /// owns. An empty account only unbinds the player's accounts.
    ///
    /// Does nothing when the player has no live assignment. Returns whether
    /// anything changed.
    pub fn bind_account(&mut self, player: &str, account: &str) -> bool {
        if !self.live.contains_key(player) {
            return false;
        }

        let changed = if account.is_empty() {
            self.unbind_player(player)
        } else {
            self.write_binding(account, player)
        };

        if changed {
            self.notify_bindings();
        }
        changed
    }

    pub fn binding(&self, account: &str) -> Option<&str> {
        self.bindings.get(account).map(String::as_str)
    }

    pub fn bindings(&self) -> &BTreeMap<String, String> {
        &self.bindings
    }

    // ---------------------------------------------------------------------
    // Reconciliation
    // ---------------------------------------------------------------------

    /// Replace the round state with `batch`. When every legend is uniquely
    /// held, each observed account is bound to the player holding its legend.
    pub fn ingest_observations(&mut self, batch: Vec<RawObservation>) {
        self.clear_observations();

        for observation in batch {
            let index = match self.groups.iter().position(|g| g.legend == observation.legend) {
                Some(index) => index,
                None => {
                    self.groups.push(LegendGroup {
                        legend: observation.legend.clone(),
                        scores: Vec::new(),
                    });
                    self.groups.len() - 1
                }
            };
            let group = &mut self.groups[index];
            group.scores.push(observation.score);
            let position = group.scores.len();
            self.positions
                .insert(observation.account, (observation.legend, position));
        }

        self.infer_bindings();
    }

    /// When every observed legend is uniquely held, bind each observed
    /// account to the player holding its legend. Returns whether any binding
    /// changed.
    ///
    /// Runs on ingest and again whenever the round is retried, so a live
    /// assignment made after capture still resolves the round.
    pub fn infer_bindings(&mut self) -> bool {
        if self.positions.is_empty() || !self.is_uniquely_resolved() {
            return false;
        }

        let inferred: Vec<(String, String)> = self
            .positions
            .iter()
            .filter_map(|(account, (legend, _))| {
                self.holders_of(legend)
                    .next()
                    .map(|player| (account.clone(), player.to_string()))
            })
            .collect();

        let mut changed = false;
        for (account, player) in inferred {
            tracing::debug!(account = %account, player = %player, "inferred account binding");
            changed |= self.write_binding(&account, &player);
        }
        if changed {
            self.notify_bindings();
        }
        changed
    }

    /// Drop the current round's observations.
    pub fn clear_observations(&mut self) {
        self.groups.clear();
        self.positions.clear();
    }

    /// Every observed legend appears exactly once and is held by exactly one
    /// live player.
    pub fn is_uniquely_resolved(&self) -> bool {
        self.groups
            .iter()
            .all(|g| g.scores.len() == 1 && self.holders_of(&g.legend).count() == 1)
    }

    /// Finalization gate: uniquely resolved, or each observed legend has as
    /// many observations as live players holding it.
    pub fn is_ready(&self) -> bool {
        if self.is_uniquely_resolved() {
            return true;
        }
        self.groups
            .iter()
            .all(|g| g.scores.len() == self.holders_of(&g.legend).count())
    }

    /// Pair every observed score with the player bound to the account
    /// captured in the same result box.
    ///
    /// Fails instead of substituting Nobody when any observation cannot be
    /// attributed.
    pub fn extract_results(&self) -> Result<FinalizedResult, ExtractError> {
        if !self.is_ready() {
            return Err(ExtractError::NotReady);
        }

        let mut entries = Vec::new();

        for group in &self.groups {
            let mut accounts: Vec<(&String, usize)> = self
                .positions
                .iter()
                .filter(|(_, (legend, _))| *legend == group.legend)
                .map(|(account, (_, position))| (account, *position))
                .collect();
            accounts.sort_by_key(|(_, position)| *position);

            for (index, score) in group.scores.iter().enumerate() {
                let position = index + 1;
                let account = match accounts.get(index) {
                    Some((account, recorded)) if *recorded == position => *account,
                    _ => {
                        return Err(ExtractError::UnaccountedObservation {
                            legend: group.legend.clone(),
                            position,
                        })
                    }
                };

                let name = self.bindings.get(account).ok_or_else(|| {
                    ExtractError::UnboundAccount {
                        legend: group.legend.clone(),
                        account: account.clone(),
                    }
                })?;

                let player = self
                    .players
                    .get(name)
                    .ok_or_else(|| ExtractError::UnknownPlayer {
                        account: account.clone(),
                        player: name.clone(),
                    })?;

                entries.push(AttributedScore {
                    player: player.clone(),
                    legend: group.legend.clone(),
                    score: *score,
                });
            }
        }

        Ok(FinalizedResult { entries })
    }

    /// Observed accounts without a binding, sorted.
    pub fn unbound_accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = self
            .positions
            .keys()
            .filter(|account| !self.bindings.contains_key(*account))
            .cloned()
            .collect();
        accounts.sort();
        accounts
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn holders_of<'a>(&'a self, legend: &'a Legend) -> impl Iterator<Item = &'a str> + 'a {
        self.live
            .iter()
            .filter(move |(_, held)| *held == legend)
            .map(|(player, _)| player.as_str())
    }

    /// A player owns at most one account: drop the player's other accounts
    /// before binding.
    fn write_binding(&mut self, account: &str, player: &str) -> bool {
        if self.binding(account) == Some(player)
            && self.bindings.values().filter(|p| *p == player).count() == 1
        {
            return false;
        }
        self.unbind_player(player);
        self.bindings.insert(account.to_string(), player.to_string());
        true
    }

    fn unbind_player(&mut self, player: &str) -> bool {
        let before = self.bindings.len();
        self.bindings.retain(|_, bound| bound != player);
        before != self.bindings.len()
    }

    fn notify_accounts(&self) {
        self.sink
            .notify(&RegistryEvent::AccountsUpdated(self.accounts()));
    }

    fn notify_players(&self) {
        self.sink.notify(&RegistryEvent::PlayersUpdated(
            self.players.values().cloned().collect(),
        ));
    }

    fn notify_live(&self) {
        self.sink
            .notify(&RegistryEvent::LivePlayersUpdated(self.live.clone()));
    }

    fn notify_bindings(&self) {
        self.sink
            .notify(&RegistryEvent::PlayerAccountsUpdated(self.bindings.clone()));
    }
}
