//! Model fixtures shared by the gate and field tests.

use std::sync::Arc;

use axum::http::Method;

use crate::{request::PermissionRequest, table::PermissionTable};

/// Every action the fixture requests are built for.
pub const ACTION_SET: [&str; 8] = [
    "retrieve",
    "list",
    "create",
    "destroy",
    "update",
    "partial_update",
    "custom_action1",
    "custom_action2",
];

/// Actions with specific checks in the fixture model.
const SPECIFIC_ACTIONS: [&str; 7] = [
    "list",
    "create",
    "destroy",
    "retrieve",
    "update",
    "custom_action1",
    "custom_action2",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Dummy;

/// Which checks the fixture model declares, and what they answer.
///
/// `None` leaves the group of checks out of the table altogether.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelFlags {
    pub base_global: Option<bool>,
    pub base_object: Option<bool>,
    pub specific_global: Option<bool>,
    pub specific_object: Option<bool>,
}

impl ModelFlags {
    /// General read/write checks only, both groups answering `true`.
    pub fn base() -> Self {
        Self {
            base_global: Some(true),
            base_object: Some(true),
            ..Self::default()
        }
    }

    /// General and specific checks, all answering `true`.
    pub fn full() -> Self {
        Self {
            base_global: Some(true),
            base_object: Some(true),
            specific_global: Some(true),
            specific_object: Some(true),
        }
    }

    pub fn table(self) -> Arc<PermissionTable<Dummy>> {
        let mut table = PermissionTable::<Dummy>::new("TestModel");

        if let Some(allowed) = self.base_global {
            table = table.read(move |_| allowed).write(move |_| allowed);
        }
        if let Some(allowed) = self.base_object {
            table = table
                .object_read(move |_, _| allowed)
                .object_write(move |_, _| allowed);
        }
        if let Some(allowed) = self.specific_global {
            for action in SPECIFIC_ACTIONS {
                table = table.global(action, move |_| allowed);
            }
        }
        if let Some(allowed) = self.specific_object {
            for action in SPECIFIC_ACTIONS {
                table = table.object(action, move |_, _| allowed);
            }
        }

        Arc::new(table)
    }
}

/// The request a client would send for `action` on the fixture routes.
pub fn request_for(action: &str) -> PermissionRequest {
    let method = match action {
        "retrieve" | "list" | "custom_action1" => Method::GET,
        "create" | "custom_action2" => Method::POST,
        "destroy" => Method::DELETE,
        "update" => Method::PUT,
        "partial_update" => Method::PATCH,
        _ => Method::GET,
    };

    PermissionRequest::new(method)
}
