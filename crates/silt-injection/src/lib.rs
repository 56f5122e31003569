//! Particle injections for the Silt particle transport engine.
//!
//! An [`InjectionSpec`] describes where and when particles enter the
//! system. Realizing it against a per-run [`ParticleIdAllocator`] yields an
//! [`Injection`] owning a contiguous id range, from which particles are
//! spawned in `Waiting` status and later placed by their ordinal.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod allocator;
pub mod error;
pub mod injection;
pub mod spread;

pub use allocator::{IdRange, ParticleIdAllocator};
pub use error::InjectionError;
pub use injection::{Injection, InjectionKind, InjectionSpec, Placement};
pub use spread::{spread_fraction, spread_index};
