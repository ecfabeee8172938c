/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Session configuration. The whole record is supplied by the caller
//! before a session request and is read-only thereafter.

/// The default assumed eye height when a stage frame of reference has to
/// be emulated, in metres.
pub const DEFAULT_STAGE_EMULATION_HEIGHT: f32 = 1.6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionMode {
    /// A "magic window" session rendering into an ordinary surface.
    Inline,
    /// An immersive session taking over a headset's display.
    ImmersiveVr,
}

impl SessionMode {
    pub fn is_immersive(self) -> bool {
        matches!(self, SessionMode::ImmersiveVr)
    }
}

/// The coordinate system against which device poses are resolved.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub enum FrameOfReferenceType {
    /// A viewer-locked space with a neck-model offset applied by the
    /// device. Origin coincides with the native origin.
    HeadModel,
    /// A seated space whose origin is at the viewer's initial eye level.
    EyeLevel,
    /// A standing space whose origin is on the floor.
    Stage,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameOfReferenceOptions {
    /// Whether a stage space may be emulated with a fixed height when the
    /// device reports no floor transform.
    pub allow_stage_emulation: bool,
    /// The eye height to assume when emulating, in metres.
    pub stage_emulation_height: f32,
}

impl Default for FrameOfReferenceOptions {
    fn default() -> Self {
        FrameOfReferenceOptions {
            allow_stage_emulation: true,
            stage_emulation_height: DEFAULT_STAGE_EMULATION_HEIGHT,
        }
    }
}

/// Creation attributes for the graphics context backing a session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct ContextAttributes {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        ContextAttributes {
            alpha: true,
            depth: true,
            stencil: false,
            antialias: true,
        }
    }
}

/// Initialization options for the layer bound to the session's target
/// framebuffer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerInit {
    pub antialias: bool,
    pub depth: bool,
    pub stencil: bool,
    pub alpha: bool,
    pub multiview: bool,
    /// Scale applied to the device-recommended framebuffer resolution.
    pub framebuffer_scale_factor: f32,
}

impl Default for LayerInit {
    fn default() -> Self {
        LayerInit {
            antialias: true,
            depth: true,
            stencil: false,
            alpha: true,
            multiview: false,
            framebuffer_scale_factor: 1.0,
        }
    }
}

/// Everything a caller submits to open a session. Immutable once
/// submitted.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "ipc", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionInit {
    pub mode: SessionMode,
    pub frame_of_reference: FrameOfReferenceType,
    pub frame_of_reference_options: FrameOfReferenceOptions,
    pub context_attributes: ContextAttributes,
    pub layer_init: LayerInit,
}

impl SessionInit {
    pub fn inline() -> SessionInit {
        SessionInit {
            mode: SessionMode::Inline,
            frame_of_reference: FrameOfReferenceType::EyeLevel,
            frame_of_reference_options: FrameOfReferenceOptions::default(),
            context_attributes: ContextAttributes::default(),
            layer_init: LayerInit::default(),
        }
    }

    pub fn immersive() -> SessionInit {
        SessionInit {
            mode: SessionMode::ImmersiveVr,
            ..SessionInit::inline()
        }
    }
}
