use std::sync::Arc;
use std::time::Duration;

use super::SavedArticlesFetcher;
use super::test_helpers::*;
use crate::cache::LocalCache;
use crate::config::FetchConfig;
use crate::error::{Error, FetchError};
use crate::saved_list::SavedPageList;
use crate::types::{Event, RunPhase, TaskState};
