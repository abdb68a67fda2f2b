//! Error taxonomy for protocol dispatch
//!
//! Handlers never talk to the client about failures directly. They return a
//! [`DispatchError`] and the runtime decides what the client sees:
//!
//! - [`DispatchError::Protocol`]: the client broke the protocol. Fatal; the
//!   connection receives `wl_display.error` and is closed.
//! - [`DispatchError::Implementation`]: the server failed while handling a
//!   valid request. Reported as a non-fatal implementation error when the
//!   client's display version supports it, otherwise degraded to no-memory.
//! - [`DispatchError::NoMemory`]: allocation failure. Fatal to this client.

use super::object::ObjectId;
use super::wire::WireError;
use thiserror::Error;

/// A fatal protocol violation, addressed at one object
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("protocol error on object {object}: code {code}: {message}")]
pub struct ProtocolError {
    pub object: ObjectId,
    pub code: u32,
    pub message: String,
}

impl ProtocolError {
    pub fn new(object: ObjectId, code: impl Into<u32>, message: impl Into<String>) -> Self {
        Self {
            object,
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn invalid_object(object: ObjectId, message: impl Into<String>) -> Self {
        Self::new(object, DisplayError::InvalidObject, message)
    }

    pub fn invalid_method(object: ObjectId, message: impl Into<String>) -> Self {
        Self::new(object, DisplayError::InvalidMethod, message)
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("implementation error: {0:#}")]
    Implementation(#[from] anyhow::Error),
    #[error("out of memory")]
    NoMemory,
}

impl DispatchError {
    pub fn protocol(object: ObjectId, code: impl Into<u32>, message: impl Into<String>) -> Self {
        DispatchError::Protocol(ProtocolError::new(object, code, message))
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, DispatchError::Implementation(_))
    }

    /// Wire errors during request decoding are always the client's fault
    pub fn malformed(object: ObjectId, err: WireError) -> Self {
        DispatchError::Protocol(ProtocolError::invalid_method(object, err.to_string()))
    }
}

macro_rules! error_codes {
    ($(#[$meta:meta])* $name:ident { $($variant:ident = $value:expr),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u32)]
        pub enum $name {
            $($variant = $value),+
        }

        impl From<$name> for u32 {
            fn from(code: $name) -> u32 {
                code as u32
            }
        }
    };
}

error_codes! {
    /// `wl_display` error codes
    DisplayError {
        InvalidObject = 0,
        InvalidMethod = 1,
        NoMemory = 2,
        Implementation = 3,
    }
}

error_codes! {
    SeatError {
        MissingCapability = 0,
    }
}

error_codes! {
    PointerError {
        Role = 0,
    }
}

error_codes! {
    XdgWmBaseError {
        Role = 0,
        DefunctSurfaces = 1,
        NotTheTopmostPopup = 2,
        InvalidPopupParent = 3,
        InvalidSurfaceState = 4,
        InvalidPositioner = 5,
        Unresponsive = 6,
    }
}

error_codes! {
    XdgPositionerError {
        InvalidInput = 0,
    }
}

error_codes! {
    XdgSurfaceError {
        NotConstructed = 1,
        AlreadyConstructed = 2,
        UnconfiguredBuffer = 3,
        InvalidSerial = 4,
        InvalidSize = 5,
        DefunctRoleObject = 6,
    }
}

error_codes! {
    XdgToplevelError {
        InvalidResizeEdge = 0,
        InvalidParent = 1,
        InvalidSize = 2,
    }
}

error_codes! {
    XdgPopupError {
        InvalidGrab = 0,
    }
}

error_codes! {
    LayerShellError {
        Role = 0,
        InvalidLayer = 1,
        AlreadyConstructed = 2,
    }
}

error_codes! {
    LayerSurfaceError {
        InvalidSurfaceState = 0,
        InvalidSize = 1,
        InvalidAnchor = 2,
        InvalidKeyboardInteractivity = 3,
    }
}
