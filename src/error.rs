//! Errors found throughout this crate

use thiserror::Error;
use x11rb::{errors::ConnectError, protocol::ErrorKind};

/// `ConfigureWindow`
const OPCODE_CONFIGURE_WINDOW: u8 = 12;
/// `GrabButton`
const OPCODE_GRAB_BUTTON: u8 = 28;
/// `GrabKey`
const OPCODE_GRAB_KEY: u8 = 33;
/// `SetInputFocus`
const OPCODE_SET_INPUT_FOCUS: u8 = 42;
/// `CopyArea`
const OPCODE_COPY_AREA: u8 = 62;
/// `PolySegment`
const OPCODE_POLY_SEGMENT: u8 = 66;
/// `PolyFillRectangle`
const OPCODE_POLY_FILL_RECTANGLE: u8 = 70;
/// `ImageText8`
const OPCODE_IMAGE_TEXT8: u8 = 76;
/// `PolyText8`
const OPCODE_POLY_TEXT8: u8 = 74;

/// Errors that occur from interacting with the X-Server or the configuration
#[derive(Debug, Error)]
pub(crate) enum Error {
    /// Failure to connect to the server
    #[error("failed to connect to the X11 server: {0}")]
    Connection(#[from] ConnectError),

    /// Another client already selected `SubstructureRedirect` on the root
    #[error("another window manager is already running")]
    OtherWindowManager,

    /// The bar font could not be opened
    #[error("no font could be loaded: {0}")]
    Font(String),

    /// A color in the configuration is malformed
    #[error("invalid color: {0}")]
    InvalidColor(String),

    /// A key or button chord is malformed
    #[error("invalid chord: {0}")]
    InvalidChord(String),

    /// A key name is not known
    #[error("unknown keysym: {0}")]
    InvalidKeysym(String),

    /// An action string is malformed
    #[error("{0}")]
    InvalidAction(String),

    /// A click location is not known
    #[error("unknown click location: {0}")]
    InvalidClick(String),

    /// A protocol error that is not a known race with a vanishing window
    #[error("fatal protocol error: request {major_opcode} failed with {kind:?}")]
    Protocol {
        /// Kind of error the server returned
        kind:         ErrorKind,
        /// Request that caused it
        major_opcode: u8,
    },
}

impl Error {
    /// Errors that are expected when a client disappears between the moment an
    /// event was generated and the moment it is handled
    pub(crate) const fn is_benign(kind: ErrorKind, major_opcode: u8) -> bool {
        match kind {
            ErrorKind::Window => true,
            ErrorKind::Match => matches!(
                major_opcode,
                OPCODE_SET_INPUT_FOCUS | OPCODE_CONFIGURE_WINDOW
            ),
            ErrorKind::Access => matches!(major_opcode, OPCODE_GRAB_BUTTON | OPCODE_GRAB_KEY),
            ErrorKind::Drawable => matches!(
                major_opcode,
                OPCODE_POLY_TEXT8
                    | OPCODE_POLY_FILL_RECTANGLE
                    | OPCODE_POLY_SEGMENT
                    | OPCODE_COPY_AREA
                    | OPCODE_IMAGE_TEXT8
            ),
            _ => false,
        }
    }
}
