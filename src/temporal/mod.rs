//=====================================================
// File: temporal/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Temporal resource ledger
// Objective: Track paradox level, aethel and chronons, and take, rewind
//            and merge timeline snapshots against configured costs
//=====================================================

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::LedgerConfig;

//=====================================================
//            Section 1: Errors
//=====================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Aethel,
    Chronons,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Aethel => write!(f, "aethel"),
            Resource::Chronons => write!(f, "chronons"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient {resource}: requested {requested:.2}, available {available:.2}")]
    InsufficientResource {
        resource: Resource,
        requested: f64,
        available: f64,
    },
    #[error("Timeline snapshot '{0}' not found")]
    SnapshotNotFound(String),
    #[error("Invalid {resource} amount {amount}")]
    InvalidAmount { resource: Resource, amount: f64 },
}

//=====================================================
//            Section 2: Snapshots
//=====================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSnapshot {
    pub id: String,
    pub paradox_level: u32,
    pub aethel: f64,
    pub chronons: f64,
    pub taken_at: DateTime<Utc>,
}

//=====================================================
//            Section 3: Ledger
//=====================================================

/// Paradox and resource accounting for one interpreter.
#[derive(Debug, Clone)]
pub struct TemporalLedger {
    paradox_level: u32,
    aethel: f64,
    chronons: f64,
    snapshots: BTreeMap<String, LedgerSnapshot>,
    next_snapshot: u64,
    high_water_crossed: bool,
    config: LedgerConfig,
}

impl Default for TemporalLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl TemporalLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            paradox_level: 0,
            aethel: config.initial_aethel,
            chronons: config.initial_chronons,
            snapshots: BTreeMap::new(),
            next_snapshot: 1,
            high_water_crossed: false,
            config,
        }
    }

    pub fn paradox_level(&self) -> u32 {
        self.paradox_level
    }

    pub fn aethel(&self) -> f64 {
        self.aethel
    }

    pub fn chronons(&self) -> f64 {
        self.chronons
    }

    pub fn high_water_mark(&self) -> u32 {
        self.config.paradox_high_water
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn snapshot(&self, id: &str) -> Option<&LedgerSnapshot> {
        self.snapshots.get(id)
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    pub fn snapshot_ids(&self) -> impl Iterator<Item = &str> {
        self.snapshots.keys().map(String::as_str)
    }

    //=====================================================
    //            Section 4: Paradox
    //=====================================================

    pub fn increase_paradox_level(&mut self, amount: u32) {
        let before = self.paradox_level;
        self.paradox_level = self.paradox_level.saturating_add(amount);
        let mark = self.config.paradox_high_water;
        if before <= mark && self.paradox_level > mark {
            tracing::warn!(
                paradox = self.paradox_level,
                high_water = mark,
                "paradox level crossed the high-water mark"
            );
            self.high_water_crossed = true;
        }
    }

    /// Clamps at zero.
    pub fn decrease_paradox_level(&mut self, amount: u32) {
        self.paradox_level = self.paradox_level.saturating_sub(amount);
    }

    /// Reports a high-water crossing once, then clears the flag.
    pub fn take_high_water_crossing(&mut self) -> bool {
        std::mem::take(&mut self.high_water_crossed)
    }

    //=====================================================
    //            Section 5: Resources
    //=====================================================

    pub fn consume_aethel(&mut self, amount: f64) -> Result<(), LedgerError> {
        let available = self.aethel;
        self.aethel = Self::debit(Resource::Aethel, available, amount)?;
        Ok(())
    }

    pub fn consume_chronons(&mut self, amount: f64) -> Result<(), LedgerError> {
        let available = self.chronons;
        self.chronons = Self::debit(Resource::Chronons, available, amount)?;
        Ok(())
    }

    pub fn replenish_aethel(&mut self, amount: f64) -> Result<(), LedgerError> {
        Self::check_amount(Resource::Aethel, amount)?;
        self.aethel += amount;
        Ok(())
    }

    pub fn replenish_chronons(&mut self, amount: f64) -> Result<(), LedgerError> {
        Self::check_amount(Resource::Chronons, amount)?;
        self.chronons += amount;
        Ok(())
    }

    fn check_amount(resource: Resource, amount: f64) -> Result<(), LedgerError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(LedgerError::InvalidAmount { resource, amount });
        }
        Ok(())
    }

    fn ensure(resource: Resource, available: f64, requested: f64) -> Result<(), LedgerError> {
        Self::check_amount(resource, requested)?;
        if requested > available {
            return Err(LedgerError::InsufficientResource {
                resource,
                requested,
                available,
            });
        }
        Ok(())
    }

    fn debit(resource: Resource, available: f64, requested: f64) -> Result<f64, LedgerError> {
        Self::ensure(resource, available, requested)?;
        Ok(available - requested)
    }

    //=====================================================
    //            Section 6: Timeline Operations
    //=====================================================

    //Function: create_timeline_snapshot
    //Purpose: Record the current ledger state under a fresh id
    //Inputs: none
    //Returns: Result<String, LedgerError>
    pub fn create_timeline_snapshot(&mut self) -> Result<String, LedgerError> {
        self.consume_chronons(self.config.snapshot_chronon_cost)?;
        let id = format!("tl-{:04}", self.next_snapshot);
        self.next_snapshot += 1;
        let snapshot = LedgerSnapshot {
            id: id.clone(),
            paradox_level: self.paradox_level,
            aethel: self.aethel,
            chronons: self.chronons,
            taken_at: Utc::now(),
        };
        self.snapshots.insert(id.clone(), snapshot);
        self.increase_paradox_level(self.config.snapshot_paradox);
        tracing::debug!(snapshot = %id, "timeline snapshot created");
        Ok(id)
    }

    /// Charges a rewind to `id` against the current balances. Nothing is
    /// refunded and the paradox level only goes up.
    pub fn rewind_to_snapshot(&mut self, id: &str) -> Result<(), LedgerError> {
        if !self.snapshots.contains_key(id) {
            return Err(LedgerError::SnapshotNotFound(id.to_string()));
        }
        self.consume_aethel(self.config.rewind_aethel_cost)?;
        self.increase_paradox_level(self.config.rewind_paradox);
        tracing::debug!(snapshot = %id, "rewound to timeline snapshot");
        Ok(())
    }

    /// Drops a snapshot that will never be rewound to or merged.
    pub fn discard_snapshot(&mut self, id: &str) -> Option<LedgerSnapshot> {
        self.snapshots.remove(id)
    }

    //Function: merge_timelines
    //Purpose: Consume the given snapshots and charge the merge cost
    //Inputs: ids: snapshot ids from the branches being merged
    //Returns: Result<(), LedgerError>
    pub fn merge_timelines(&mut self, ids: &[String]) -> Result<(), LedgerError> {
        if let Some(missing) = ids.iter().find(|id| !self.snapshots.contains_key(*id)) {
            return Err(LedgerError::SnapshotNotFound(missing.clone()));
        }
        Self::ensure(Resource::Chronons, self.chronons, self.config.merge_chronon_cost)?;
        Self::ensure(Resource::Aethel, self.aethel, self.config.merge_aethel_cost)?;
        self.chronons -= self.config.merge_chronon_cost;
        self.aethel -= self.config.merge_aethel_cost;
        for id in ids {
            self.snapshots.remove(id);
        }
        let paradox = self.config.snapshot_paradox.max(self.config.rewind_paradox);
        self.increase_paradox_level(paradox);
        tracing::debug!(timelines = ids.len(), "timelines merged");
        Ok(())
    }
}

//=============================================/*
//  Resources never go negative; every failed operation leaves the ledger unchanged.
//============================================*/
//=====================================================
//            Section 7: Unit Tests
//=====================================================


//=====================================================
// End of file
//=====================================================
