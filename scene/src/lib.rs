//! Shared-scene state core for the collaborative 3D builder.
//!
//! This crate owns everything the builder knows about the scene without
//! touching a network, a database, or a renderer: the local projection of
//! placed objects and connected peers, the reconciliation of out-of-order
//! change notifications into that projection, and the pointer gesture state
//! machine that turns raw input into optimistic mutations plus persistence
//! [`session::Action`]s. The host is responsible for executing those
//! actions and feeding their completions back in.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Top-level [`session::SessionCore`] wiring stores, reconciler, and controller |
//! | [`doc`] | Scene objects and the in-memory [`doc::SceneStore`] |
//! | [`presence`] | Connected peers and the [`presence::PresenceStore`] |
//! | [`record`] | Store-shape records and the view/record format adapter |
//! | [`reconcile`] | Change and presence event parsing plus the [`reconcile::Reconciler`] |
//! | [`controller`] | Pointer intents, optimistic mutation, and emitted actions |
//! | [`input`] | Gesture state types consumed by the controller |
//! | [`notice`] | Auto-dismissing user-facing notifications |
//! | [`color`] | Deterministic user color assignment |
//! | [`error`] | Error taxonomy shared by every module |
//! | [`consts`] | Shared numeric and palette constants |

pub mod color;
pub mod consts;
pub mod controller;
pub mod doc;
pub mod error;
pub mod input;
pub mod notice;
pub mod presence;
pub mod reconcile;
pub mod record;
pub mod session;
