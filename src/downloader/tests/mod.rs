use super::test_helpers::*;
use super::*;
use crate::error::Error;
use crate::test_helpers::FakeEngine;
use crate::types::Status;
use std::sync::atomic::Ordering;
use std::time::Duration;
