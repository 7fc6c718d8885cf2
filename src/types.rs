// Copyright (c) Anza Technology, Inc.
// SPDX-License-Identifier: Apache-2.0

pub mod action;

pub use self::action::{Action, ParseActionError};
