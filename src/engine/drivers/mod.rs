// SPDX-License-Identifier: Apache-2.0

pub mod postgres;
pub mod postgres_catalog;
