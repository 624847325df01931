// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

/// SG_IO device handles.
pub mod sg;

pub use sg::{DataDirection, DeviceError, SgDevice};
