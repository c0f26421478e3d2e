use super::*;
use crate::downloader::test_helpers::{
    ScriptedFetcher, StaticCatalog, create_test_downloader, seed_album, wait_for_outcome,
};
use crate::registry::FAILED_SENTINEL;
use crate::types::{JobId, Lifecycle};
