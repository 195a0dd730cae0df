// ─── GameVault Importer Core ───
// Turns the titles owned on a GOG account into one installer archive each.
//
// Architecture:
//   core/
//     auth/       — Session secrets from the environment
//     catalog/    — Title metadata decoding, variant selection, archive naming
//     downloader/ — Storefront capability trait + reqwest GOG client
//     archive/    — Streaming zip writer with fetch-failure policy
//     sync/       — Per-title pipeline and metadata snapshots
//     state/      — Run settings

pub mod archive;
pub mod auth;
pub mod catalog;
pub mod downloader;
pub mod error;
pub mod http;
pub mod state;
pub mod sync;
