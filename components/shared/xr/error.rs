/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

/// Errors that can be produced by XR session negotiation and lifecycle
/// operations.
///
/// Tracking loss is deliberately absent: a missing viewer pose is a
/// per-frame skip condition reported through logging, not a failure
/// surfaced to the caller.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Error {
    /// No XR runtime or device is present. Fatal to initialization; the
    /// caller must not proceed to a session request.
    NotAvailable,
    /// The device rejected the requested session configuration. The caller
    /// may retry with a different configuration.
    NotSupported,
    /// A conflicting session is already active. The caller must end the
    /// existing session first.
    InvalidState,
    /// An immersive session was requested without a qualifying
    /// user-initiated trigger.
    SecurityPrecondition,
    /// The platform backend failed in a device-specific way.
    BackendSpecific(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotAvailable => write!(f, "no XR device available"),
            Error::NotSupported => write!(f, "session configuration not supported"),
            Error::InvalidState => write!(f, "a conflicting session is already active"),
            Error::SecurityPrecondition => {
                write!(f, "immersive session requires a user activation")
            },
            Error::BackendSpecific(reason) => write!(f, "backend error: {}", reason),
        }
    }
}

impl std::error::Error for Error {}
