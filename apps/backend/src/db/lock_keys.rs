//! Partitioning of the advisory-lock integer space.
//!
//! Every subsystem that serializes work on an entity shares one signed 64-bit
//! lock key space. Each [`LockDomain`] owns a fixed band starting at
//! `discriminant * DOMAIN_BAND_WIDTH`; the entity id is added to that base.
//!
//! The discriminants and the band width are a wire contract: processes from
//! different deploys must compute identical keys during a rolling upgrade, so
//! they must never change once shipped.

use std::fmt;

use thiserror::Error;

/// Width of one domain band. A multiple of 100,000,000 that holds every `u32`.
pub const DOMAIN_BAND_WIDTH: i64 = 10_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i64)]
pub enum LockDomain {
    League = 1,
    Roster = 2,
    Trade = 3,
    Waiver = 4,
    Auction = 5,
    Lineup = 6,
    Draft = 7,
    Job = 8,
}

impl LockDomain {
    pub const ALL: [LockDomain; 8] = [
        LockDomain::League,
        LockDomain::Roster,
        LockDomain::Trade,
        LockDomain::Waiver,
        LockDomain::Auction,
        LockDomain::Lineup,
        LockDomain::Draft,
        LockDomain::Job,
    ];

    pub const fn base(self) -> i64 {
        self as i64 * DOMAIN_BAND_WIDTH
    }

    /// Infallible key for 32-bit ids.
    pub const fn key(self, id: u32) -> LockKey {
        LockKey(self.base() + id as i64)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            LockDomain::League => "league",
            LockDomain::Roster => "roster",
            LockDomain::Trade => "trade",
            LockDomain::Waiver => "waiver",
            LockDomain::Auction => "auction",
            LockDomain::Lineup => "lineup",
            LockDomain::Draft => "draft",
            LockDomain::Job => "job",
        }
    }

    fn from_discriminant(value: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|d| *d as i64 == value)
    }
}

/// Well-known ids in the `Job` domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum JobId {
    IdempotencyReaper = 1,
}

impl JobId {
    pub const fn lock_key(self) -> LockKey {
        LockDomain::Job.key(self as u32)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockKeyError {
    #[error("lock id {id} for domain {domain:?} is negative")]
    Negative { domain: LockDomain, id: i64 },
    #[error("lock id {id} for domain {domain:?} exceeds the domain band")]
    OutOfBand { domain: LockDomain, id: i64 },
}

/// A key in the shared advisory-lock space. Ordered so multi-lock callers can
/// acquire in a canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LockKey(i64);

impl LockKey {
    /// Key for a 64-bit database id; rejects ids outside the domain band.
    pub fn try_new(domain: LockDomain, id: i64) -> Result<Self, LockKeyError> {
        if id < 0 {
            return Err(LockKeyError::Negative { domain, id });
        }
        if id >= DOMAIN_BAND_WIDTH {
            return Err(LockKeyError::OutOfBand { domain, id });
        }
        Ok(LockKey(domain.base() + id))
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Recover the `(domain, id)` pair this key was built from.
    pub fn decode(self) -> Option<(LockDomain, i64)> {
        let domain = LockDomain::from_discriminant(self.0 / DOMAIN_BAND_WIDTH)?;
        Some((domain, self.0 % DOMAIN_BAND_WIDTH))
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Some((domain, id)) => write!(f, "{}:{id}", domain.as_str()),
            None => write!(f, "raw:{}", self.0),
        }
    }
}
