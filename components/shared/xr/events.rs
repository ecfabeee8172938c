/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use crate::Sender;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Event {
    /// The session was ended by the device, e.g. the headset was removed
    /// or the OS interrupted presentation.
    SessionEnd,
    /// Session focused/blurred/hidden.
    VisibilityChange(Visibility),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum Visibility {
    /// Session fully displayed to the user.
    Visible,
    /// Session still visible, but not the primary focus.
    VisibleBlurred,
    /// Session not visible.
    Hidden,
}

/// Buffers events raised before the controller has wired an event
/// destination, then flushes them once one arrives.
pub enum EventBuffer {
    Buffered(Vec<Event>),
    Sink(Sender<Event>),
}

impl Default for EventBuffer {
    fn default() -> Self {
        EventBuffer::Buffered(vec![])
    }
}

impl EventBuffer {
    pub fn callback(&mut self, event: Event) {
        match *self {
            EventBuffer::Buffered(ref mut events) => events.push(event),
            EventBuffer::Sink(ref dest) => {
                if dest.send(event).is_err() {
                    log::warn!("dropping event sent to a closed destination");
                }
            },
        }
    }

    pub fn upgrade(&mut self, dest: Sender<Event>) {
        if let EventBuffer::Buffered(ref mut events) = *self {
            for event in events.drain(..) {
                let _ = dest.send(event);
            }
        }
        *self = EventBuffer::Sink(dest)
    }

    /// Drop any wired destination, reverting to buffering. Used when a
    /// session ends and its event channel with it.
    pub fn downgrade(&mut self) {
        *self = EventBuffer::Buffered(vec![]);
    }
}
