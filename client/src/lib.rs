//! # Headless Client Library
//!
//! A client for the simulation server that plays without rendering. It
//! connects over UDP, drives its player with scripted input, and keeps a
//! local view of the world that stays responsive under latency.
//!
//! ## Client-Side Prediction
//! Inputs are applied to the own entity immediately, using the same motion
//! step as the server (`shared::motion`), and kept in a history until the
//! server acknowledges them.
//!
//! ## Server Reconciliation
//! Each snapshot echoes the last input sequence the server applied. The
//! client drops acknowledged inputs, replays the rest on top of the
//! confirmed state, and rolls back when the result strays too far from what
//! it predicted.
//!
//! ## Resynchronization
//! After reactivating, or when its entity has been missing from snapshots
//! for a while, the client asks the server for a full resync.
//!
//! ## Module Organization
//!
//! - `game`: confirmed view, prediction, reconciliation and the event log.
//! - `input`: seeded scripted input.
//! - `network`: UDP transport and the client loop.

pub mod game;
pub mod input;
pub mod network;
